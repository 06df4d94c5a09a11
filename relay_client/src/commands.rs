//! Turns typed lines into frames for the relay.

use relay_core::Request;

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Quit,
    Request(Request),
    /// Sent verbatim, so hand-written JSON requests still work
    Text(String),
    Usage(&'static str),
    Empty,
}

pub const HELP: &str = "Commands: /files, /peers, /get <hash>, quit. Anything else is chat.";

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if trimmed.eq_ignore_ascii_case("quit") {
        return Input::Quit;
    }

    let mut words = trimmed.split_whitespace();
    match words.next() {
        Some("/files") => Input::Request(Request::ListFiles),
        Some("/peers") => Input::Request(Request::ListPeers),
        Some("/get") => match (words.next(), words.next()) {
            (Some(hash), None) => Input::Request(Request::RequestFile {
                hash: hash.to_string(),
            }),
            _ => Input::Usage("Usage: /get <hash>"),
        },
        Some("/help") => Input::Usage(HELP),
        _ => Input::Text(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(parse_input("/files"), Input::Request(Request::ListFiles));
        assert_eq!(parse_input(" /peers "), Input::Request(Request::ListPeers));
        assert_eq!(
            parse_input("/get abc123"),
            Input::Request(Request::RequestFile {
                hash: "abc123".to_string()
            })
        );
        assert_eq!(parse_input("Quit"), Input::Quit);
        assert_eq!(parse_input(""), Input::Empty);
    }

    #[test]
    fn test_bad_get_shows_usage() {
        assert!(matches!(parse_input("/get"), Input::Usage(_)));
        assert!(matches!(parse_input("/get a b"), Input::Usage(_)));
    }

    #[test]
    fn test_everything_else_is_text() {
        assert_eq!(
            parse_input("hello there"),
            Input::Text("hello there".to_string())
        );
        assert_eq!(
            parse_input(r#"{"type":"LIST_FILES"}"#),
            Input::Text(r#"{"type":"LIST_FILES"}"#.to_string())
        );
    }
}
