//! Parsing of terminal input lines.

/// One line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/join <name>`
    Join(String),
    /// `/to <peer>`
    To(String),
    /// `/users`
    Users,
    /// `/logout`
    Logout,
    /// `/quit`
    Quit,
    /// `/help`
    Help,
    /// Anything else: a message for the open conversation.
    Say(String),
    /// A command that was not understood.
    Unknown(String),
}

/// Help text listing every command.
pub const HELP: &str = "\
/join <name>  join the relay as <name>
/to <peer>    open the conversation with <peer>
/users        list who is online
/logout       forget this identity and its history
/quit         exit
an empty line tells the open conversation you are typing
anything else is sent to the open conversation";

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_owned());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match (name, arg.is_empty()) {
            ("join", false) => Self::Join(arg.to_owned()),
            ("to", false) => Self::To(arg.to_owned()),
            ("users", _) => Self::Users,
            ("logout", _) => Self::Logout,
            ("quit" | "exit", _) => Self::Quit,
            ("help", _) => Self::Help,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}
