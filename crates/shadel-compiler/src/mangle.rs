//! Mangled symbol names.
//!
//! Names are stable across compilation units: a global is
//! `scope.scope.name` and a function is `scope.scope.name.<hash>`, where
//! the hash covers the parameter type codes.

use shadel_core::SignatureHash;
use shadel_types::TypeSpec;

fn join(path: &[String], name: &str) -> String {
    let mut mangled = String::new();
    for segment in path {
        mangled.push_str(segment);
        mangled.push('.');
    }
    mangled.push_str(name);
    mangled
}

/// The symbol of a global variable.
pub fn global_symbol(path: &[String], name: &str) -> String {
    join(path, name)
}

/// The symbol of a function.
pub fn function_symbol(path: &[String], name: &str, params: &[TypeSpec]) -> String {
    let hash = SignatureHash::from_codes(params.iter().map(|p| p.code()));
    format!("{}.{hash}", join(path, name))
}

/// The export key of a function: `name.ret.arg...`.
pub fn signature_key(name: &str, ret: &TypeSpec, params: &[TypeSpec]) -> String {
    let mut key = format!("{name}.{}", ret.code());
    for param in params {
        key.push('.');
        key.push_str(param.code());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadel_types::TypeRegistry;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn globals_join_the_scope_path() {
        assert_eq!(global_symbol(&path(&["main", "lights"]), "power"), "main.lights.power");
        assert_eq!(global_symbol(&[], "power"), "power");
    }

    #[test]
    fn functions_append_a_parameter_hash() {
        let registry = TypeRegistry::with_standard_types();
        let int = registry.get("int").unwrap();
        let float = registry.get("float").unwrap();

        let a = function_symbol(&path(&["main"]), "f", &[int.clone(), float.clone()]);
        let b = function_symbol(&path(&["main"]), "f", &[float.clone(), int.clone()]);
        assert!(a.starts_with("main.f."));
        assert_ne!(a, b);
        assert_eq!(a, function_symbol(&path(&["main"]), "f", &[int, float]));
    }

    #[test]
    fn export_keys_list_codes() {
        let registry = TypeRegistry::with_standard_types();
        let float = registry.get("float").unwrap();
        let vec3 = registry.get("vec3").unwrap();
        assert_eq!(signature_key("falloff", &float, &[vec3, float.clone()]), "falloff.f.v3.f");
    }
}
