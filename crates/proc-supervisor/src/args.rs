//! Allow-list filter over the argument vector forwarded to the daemon.
//!
//! Tokens the allow-list does not know pass through unchanged. That makes
//! this a burst filter for known-bad values, not a deny-by-default barrier;
//! the fallback is deliberate and pinned by tests.

use tracing::warn;

/// What a recognized flag expects after its name.
enum Arity {
    /// Stands alone, no value.
    Switch,
    /// Takes one value, either as `--flag=value` or as the next token.
    Value(ValueRule),
}

enum ValueRule {
    /// Integer in 1..=65535.
    Port,
    /// Case-insensitive `true` or `false`.
    Bool,
    /// Any non-empty string.
    NonEmpty,
}

impl ValueRule {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Port => value
                .parse::<u32>()
                .map(|port| (1..=65535).contains(&port))
                .unwrap_or(false),
            Self::Bool => {
                value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
            }
            Self::NonEmpty => !value.is_empty(),
        }
    }
}

/// Canonicalize short aliases for lookup; the emitted token stays as-is.
fn canonical(flag: &str) -> &str {
    match flag {
        "-h" => "--help",
        "-v" => "--version",
        "-d" => "--daemon",
        other => other,
    }
}

fn lookup(flag: &str) -> Option<Arity> {
    match canonical(flag) {
        "--help" | "--version" | "--daemon" | "--skip-hash-check" | "--sequential" => {
            Some(Arity::Switch)
        }
        "--webui-port" | "--torrenting-port" => Some(Arity::Value(ValueRule::Port)),
        "--add-stopped" | "--skip-dialog" => Some(Arity::Value(ValueRule::Bool)),
        "--profile" | "--configuration" | "--save-path" => Some(Arity::Value(ValueRule::NonEmpty)),
        _ => None,
    }
}

/// Filter `args` in a single pass.
///
/// Recognized flags with invalid values are dropped (with their value) and
/// warned about; a literal `--` passes itself and everything after it
/// through untouched; unrecognized tokens pass through unchanged.
pub fn sanitize_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut i = 0;

    while i < args.len() {
        let token = &args[i];

        if token == "--" {
            out.extend(args[i..].iter().cloned());
            break;
        }

        if let Some((flag, value)) = token.split_once('=') {
            match lookup(flag) {
                Some(Arity::Value(rule)) if rule.accepts(value) => out.push(token.clone()),
                Some(Arity::Value(_)) => {
                    warn!(flag, value, "dropping flag with invalid value");
                }
                Some(Arity::Switch) => {
                    warn!(flag, value, "dropping switch carrying an unexpected value");
                }
                None => out.push(token.clone()),
            }
            i += 1;
            continue;
        }

        match lookup(token) {
            Some(Arity::Switch) => out.push(token.clone()),
            Some(Arity::Value(rule)) => match args.get(i + 1) {
                Some(value) if rule.accepts(value) => {
                    out.push(token.clone());
                    out.push(value.clone());
                    i += 1;
                }
                Some(value) => {
                    warn!(flag = %token, value = %value, "dropping flag with invalid value");
                    i += 1;
                }
                None => warn!(flag = %token, "dropping flag with missing value"),
            },
            None => out.push(token.clone()),
        }

        i += 1;
    }

    out
}
