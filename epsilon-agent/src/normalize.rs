//! Text-modality reply normalization.
//!
//! Best effort only. Models wrap commands in code fences, add a second line
//! of commentary, or leak chat-template tokens (`<|end|>`); this strips the
//! common cases and nothing more. One reply always yields exactly one command
//! string, possibly empty. Providers with other quirks may need more rules.

/// Marker that opens a leaked chat-template token
const TEMPLATE_MARKER: &str = "<|";

/// Reduce a raw reply to a single command line
pub fn normalize_reply(reply: &str) -> String {
    let first = reply.trim().lines().next().unwrap_or_default();
    let mut command = unquote(first.trim_matches('`').trim());

    if let Some(pos) = command.find(TEMPLATE_MARKER) {
        command = command[..pos].trim();
    }

    command.to_string()
}

/// Drop one pair of matching quotes wrapping the whole command
fn unquote(command: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = command
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    command
}

/// Case-insensitive substring match on the give-up keyword
pub fn is_give_up(reply: &str, keyword: &str) -> bool {
    !keyword.is_empty() && reply.to_uppercase().contains(&keyword.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line_only() {
        assert_eq!(normalize_reply("go north\nThen I will look around."), "go north");
        assert_eq!(normalize_reply("  look  "), "look");
    }

    #[test]
    fn test_strips_backticks() {
        assert_eq!(normalize_reply("`take flashlight`"), "take flashlight");
        assert_eq!(normalize_reply("```cat README```"), "cat README");
        assert_eq!(normalize_reply("\"go north\""), "go north");
        assert_eq!(normalize_reply("'look'"), "look");
        assert_eq!(normalize_reply("echo 'hi'"), "echo 'hi'");
    }

    #[test]
    fn test_cuts_template_tokens() {
        assert_eq!(normalize_reply("use keycard<|im_end|>"), "use keycard");
        assert_eq!(normalize_reply("<|end|>"), "");
    }

    #[test]
    fn test_no_splitting_on_separators() {
        assert_eq!(normalize_reply("cd north && ls"), "cd north && ls");
    }

    #[test]
    fn test_blank_reply() {
        assert_eq!(normalize_reply(""), "");
        assert_eq!(normalize_reply("\n\n"), "");
        assert_eq!(normalize_reply("```"), "");
    }

    #[test]
    fn test_give_up() {
        assert!(is_give_up("GIVE_UP", "GIVE_UP"));
        assert!(is_give_up("ok, give_up now", "GIVE_UP"));
        assert!(!is_give_up("go north", "GIVE_UP"));
        assert!(!is_give_up("anything", ""));
    }
}
