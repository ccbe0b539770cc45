//! Parameter resolution for arguments, environment variables and headers.
//!
//! Precedence for every item: override (key present) → static value →
//! default value → empty. Resolution is pure; the same inputs always
//! produce the same output.

use std::collections::BTreeMap;

use crate::error::{ParamKind, ResolveError};
use crate::registry::{Argument, ArgumentKind, KeyValueSpec};

pub type Overrides = BTreeMap<String, String>;

fn resolve_value(name: &str, static_value: &str, default_value: &str, overrides: &Overrides) -> String {
    if !name.is_empty()
        && let Some(value) = overrides.get(name)
    {
        return value.clone();
    }
    if !static_value.is_empty() {
        return static_value.to_string();
    }
    default_value.to_string()
}

/// Resolve environment variables or headers into a map.
///
/// Every required entry that resolves empty is reported in one error.
/// Override keys the registry entry does not declare are passed through.
pub fn resolve_key_values(
    owner: &str,
    kind: ParamKind,
    specs: &[KeyValueSpec],
    overrides: &Overrides,
) -> Result<BTreeMap<String, String>, ResolveError> {
    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();

    for spec in specs {
        let value = resolve_value(&spec.name, &spec.static_value, &spec.default_value, overrides);
        if value.is_empty() {
            if spec.required {
                missing.push(spec.name.clone());
            }
            continue;
        }
        resolved.insert(spec.name.clone(), value);
    }

    if !missing.is_empty() {
        return Err(ResolveError::MissingRequired {
            owner: owner.to_string(),
            kind,
            missing,
        });
    }

    for (key, value) in overrides {
        resolved.entry(key.clone()).or_insert_with(|| value.clone());
    }

    Ok(resolved)
}

/// Resolve an argument list into command-line tokens in declaration order.
///
/// Positional arguments that resolve empty are skipped. Named arguments
/// always emit their name, so value-less flags such as `--rm` work.
pub fn resolve_arguments(
    owner: &str,
    args: &[Argument],
    overrides: &Overrides,
) -> Result<Vec<String>, ResolveError> {
    let mut tokens = Vec::new();
    let mut missing = Vec::new();

    for arg in args {
        let value = resolve_value(&arg.name, &arg.static_value, &arg.default_value, overrides);
        if value.is_empty() && arg.required {
            missing.push(if arg.name.is_empty() {
                format!("positional argument #{}", tokens.len() + missing.len() + 1)
            } else {
                arg.name.clone()
            });
            continue;
        }
        match arg.kind {
            ArgumentKind::Positional => {
                if !value.is_empty() {
                    tokens.push(value);
                }
            }
            ArgumentKind::Named => {
                tokens.push(arg.name.clone());
                if !value.is_empty() {
                    tokens.push(value);
                }
            }
        }
    }

    if !missing.is_empty() {
        return Err(ResolveError::MissingRequired {
            owner: owner.to_string(),
            kind: ParamKind::Argument,
            missing,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> Overrides {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // =========================================================================
    // Key/value resolution
    // =========================================================================

    #[test]
    fn test_override_beats_static_and_default() {
        let specs = vec![
            KeyValueSpec::new("LOG_LEVEL")
                .with_value("warn")
                .with_default("info"),
        ];

        let env = resolve_key_values(
            "fs",
            ParamKind::EnvironmentVariable,
            &specs,
            &overrides(&[("LOG_LEVEL", "debug")]),
        )
        .unwrap();

        assert_eq!(env.get("LOG_LEVEL").map(String::as_str), Some("debug"));
    }

    #[test]
    fn test_static_beats_default() {
        let specs = vec![KeyValueSpec::new("MODE").with_value("ro").with_default("rw")];
        let env = resolve_key_values("fs", ParamKind::EnvironmentVariable, &specs, &Overrides::new())
            .unwrap();
        assert_eq!(env.get("MODE").map(String::as_str), Some("ro"));
    }

    #[test]
    fn test_default_used_when_nothing_else() {
        let specs = vec![KeyValueSpec::new("MODE").with_default("rw")];
        let env = resolve_key_values("fs", ParamKind::EnvironmentVariable, &specs, &Overrides::new())
            .unwrap();
        assert_eq!(env.get("MODE").map(String::as_str), Some("rw"));
    }

    #[test]
    fn test_optional_empty_values_are_omitted() {
        let specs = vec![KeyValueSpec::new("OPTIONAL")];
        let env = resolve_key_values("fs", ParamKind::EnvironmentVariable, &specs, &Overrides::new())
            .unwrap();
        assert!(env.is_empty());
    }

    #[test]
    fn test_all_missing_required_are_reported() {
        let specs = vec![
            KeyValueSpec::new("API_KEY").required(),
            KeyValueSpec::new("REGION").with_default("eu"),
            KeyValueSpec::new("ACCOUNT").required(),
        ];

        let err = resolve_key_values("billing", ParamKind::EnvironmentVariable, &specs, &Overrides::new())
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::MissingRequired {
                owner: "billing".to_string(),
                kind: ParamKind::EnvironmentVariable,
                missing: vec!["API_KEY".to_string(), "ACCOUNT".to_string()],
            }
        );
    }

    #[test]
    fn test_required_satisfied_by_override() {
        let specs = vec![KeyValueSpec::new("Authorization").required()];
        let headers = resolve_key_values(
            "remote",
            ParamKind::Header,
            &specs,
            &overrides(&[("Authorization", "Bearer abc")]),
        )
        .unwrap();
        assert_eq!(headers["Authorization"], "Bearer abc");
    }

    #[test]
    fn test_undeclared_overrides_are_included() {
        let specs = vec![KeyValueSpec::new("DECLARED").with_value("1")];
        let env = resolve_key_values(
            "fs",
            ParamKind::EnvironmentVariable,
            &specs,
            &overrides(&[("AD_HOC", "yes")]),
        )
        .unwrap();

        assert_eq!(env.len(), 2);
        assert_eq!(env["AD_HOC"], "yes");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let specs = vec![
            KeyValueSpec::new("A").with_default("1"),
            KeyValueSpec::new("B").with_value("2"),
        ];
        let input = overrides(&[("C", "3")]);
        let first = resolve_key_values("x", ParamKind::EnvironmentVariable, &specs, &input).unwrap();
        let second = resolve_key_values("x", ParamKind::EnvironmentVariable, &specs, &input).unwrap();
        assert_eq!(first, second);
    }

    // =========================================================================
    // Argument resolution
    // =========================================================================

    #[test]
    fn test_positional_in_declaration_order_skipping_empty() {
        let args = vec![
            Argument::positional("first"),
            Argument::positional(""),
            Argument::positional("").with_default("third"),
        ];
        let tokens = resolve_arguments("x", &args, &Overrides::new()).unwrap();
        assert_eq!(tokens, vec!["first", "third"]);
    }

    #[test]
    fn test_named_flag_without_value() {
        let args = vec![Argument::named("--rm"), Argument::named("--port").with_value("8080")];
        let tokens = resolve_arguments("x", &args, &Overrides::new()).unwrap();
        assert_eq!(tokens, vec!["--rm", "--port", "8080"]);
    }

    #[test]
    fn test_argument_override_by_name() {
        let args = vec![
            Argument::named("--root").with_default("/data"),
            Argument::positional("").with_name("target").with_default("a"),
        ];
        let tokens = resolve_arguments(
            "x",
            &args,
            &overrides(&[("--root", "/srv"), ("target", "b")]),
        )
        .unwrap();
        assert_eq!(tokens, vec!["--root", "/srv", "b"]);
    }

    #[test]
    fn test_required_argument_missing() {
        let args = vec![Argument::named("--token").required()];
        let err = resolve_arguments("x", &args, &Overrides::new()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingRequired {
                kind: ParamKind::Argument,
                ..
            }
        ));
    }
}
