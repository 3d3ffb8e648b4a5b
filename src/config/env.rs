//! Environment variable expansion for user-supplied paths
//!
//! Save locations are often written as `%APPDATA%\Game` or `$HOME/.local/share/game`.
//! References are expanded from the process environment; unknown variables are
//! left exactly as written.

use std::path::PathBuf;

/// Expand `$VAR`, `${VAR}` and `%VAR%` references in `input`
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand references in a path string and return it as a `PathBuf`
pub fn expand_path(input: &str) -> PathBuf {
    PathBuf::from(expand_env_vars(input))
}

/// Expand references using a custom variable lookup
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '$' => {
                if chars.get(i + 1) == Some(&'{') {
                    if let Some(close) = find_char(&chars, i + 2, '}') {
                        let name: String = chars[i + 2..close].iter().collect();
                        if let Some(value) = valid_name(&name).then(|| lookup(&name)).flatten() {
                            output.push_str(&value);
                            i = close + 1;
                            continue;
                        }
                    }
                } else {
                    let end = scan_name(&chars, i + 1);
                    if end > i + 1 {
                        let name: String = chars[i + 1..end].iter().collect();
                        if let Some(value) = lookup(&name) {
                            output.push_str(&value);
                            i = end;
                            continue;
                        }
                    }
                }
                output.push('$');
                i += 1;
            }
            '%' => {
                if let Some(close) = find_char(&chars, i + 1, '%') {
                    let name: String = chars[i + 1..close].iter().collect();
                    if let Some(value) = valid_name(&name).then(|| lookup(&name)).flatten() {
                        output.push_str(&value);
                        i = close + 1;
                        continue;
                    }
                }
                output.push('%');
                i += 1;
            }
            c => {
                output.push(c);
                i += 1;
            }
        }
    }

    output
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    (from..chars.len()).find(|&j| chars[j] == target)
}

fn scan_name(chars: &[char], from: usize) -> usize {
    let mut end = from;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    end
}

// Windows names such as `ProgramFiles(x86)` carry parentheses
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/tarnished".to_string()),
            "APPDATA" => Some("C:\\Users\\t\\AppData\\Roaming".to_string()),
            "ProgramFiles(x86)" => Some("C:\\Program Files (x86)".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_dollar_forms() {
        assert_eq!(
            expand_with("$HOME/.local/share/game", lookup),
            "/home/tarnished/.local/share/game"
        );
        assert_eq!(expand_with("${HOME}/saves", lookup), "/home/tarnished/saves");
    }

    #[test]
    fn test_percent_form() {
        assert_eq!(
            expand_with("%APPDATA%\\EldenRing", lookup),
            "C:\\Users\\t\\AppData\\Roaming\\EldenRing"
        );
        assert_eq!(
            expand_with("%ProgramFiles(x86)%\\Steam", lookup),
            "C:\\Program Files (x86)\\Steam"
        );
    }

    #[test]
    fn test_unknown_variables_untouched() {
        assert_eq!(expand_with("$NOPE/x", lookup), "$NOPE/x");
        assert_eq!(expand_with("${NOPE}/x", lookup), "${NOPE}/x");
        assert_eq!(expand_with("%GAME_INSTALL%\\saves", lookup), "%GAME_INSTALL%\\saves");
        assert_eq!(expand_with("100% done", lookup), "100% done");
        assert_eq!(expand_with("cost $", lookup), "cost $");
    }

    #[test]
    fn test_plain_path() {
        assert_eq!(expand_with("/saves/er", lookup), "/saves/er");
    }
}
