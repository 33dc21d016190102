//! Protocol line parser: one raw line in, one tagged [`Command`] out.
//!
//! Parsing is deliberately separated from execution so the verb table can be
//! unit-tested without any I/O. Verbs are matched case-insensitively, as the
//! argument splits here are purely shape-level; whether an argument resolves
//! to a real group or message is the executor's business.

/// A parsed protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Join(String),
    Leave(String),
    Message { group: String, body: String },
    GetMessage(String),
    Users(String),
    Groups,
    Ping,
    Quit,
    /// Blank input line; produces no reply.
    Empty,
    /// Unrecognized verb, kept for logging.
    Unknown(String),
}

/// Split a raw input line into a command. Never fails: unknown verbs and
/// blank lines get their own variants.
pub fn parse_line(raw: &str) -> Command {
    let line = raw.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_uppercase().as_str() {
        "LOGIN" => Command::Login(arg.to_string()),
        "JOIN" => Command::Join(arg.to_string()),
        "LEAVE" => Command::Leave(arg.to_string()),
        "MESSAGE" => match arg.split_once(char::is_whitespace) {
            Some((group, body)) => Command::Message {
                group: group.to_string(),
                body: body.trim().to_string(),
            },
            None => Command::Message {
                group: arg.to_string(),
                body: String::new(),
            },
        },
        "GET_MESSAGE" => Command::GetMessage(arg.to_string()),
        "USERS" => Command::Users(arg.to_string()),
        "GROUPS" => Command::Groups,
        "PING" => Command::Ping,
        "QUIT" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_match_case_insensitively() {
        assert_eq!(parse_line("ping"), Command::Ping);
        assert_eq!(parse_line("Quit"), Command::Quit);
        assert_eq!(parse_line("login alice"), Command::Login("alice".into()));
    }

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(parse_line(""), Command::Empty);
        assert_eq!(parse_line("   "), Command::Empty);
    }

    #[test]
    fn arguments_are_trimmed() {
        assert_eq!(parse_line("JOIN  1 "), Command::Join("1".into()));
        assert_eq!(parse_line("LOGIN"), Command::Login(String::new()));
    }

    #[test]
    fn message_splits_group_from_body() {
        assert_eq!(
            parse_line("MESSAGE 1 Hello|World"),
            Command::Message {
                group: "1".into(),
                body: "Hello|World".into()
            }
        );
        assert_eq!(
            parse_line("MESSAGE 1"),
            Command::Message {
                group: "1".into(),
                body: String::new()
            }
        );
    }

    #[test]
    fn unknown_verbs_are_preserved() {
        assert_eq!(parse_line("FROB x y"), Command::Unknown("FROB".into()));
    }
}
