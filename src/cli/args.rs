//! Command-line argument parsing for the `bazaar` binary.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// First page of other sellers' published listings
    Feed { limit: usize },
    /// The signed-in seller's drafts
    Drafts { limit: usize },
    /// Title search over other sellers' listings
    Search { text: String, limit: usize },
    /// List categories
    Categories,
    /// Prompt for email and password and store the session
    Login,
    /// Revoke and forget the stored session
    Logout,
    /// Print usage
    Help,
}

/// Parse command-line arguments and return the command to run.
///
/// ```
/// use bazaar::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["bazaar".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), Ok(CliCommand::Version));
/// ```
pub fn parse_args<I>(args: I) -> Result<CliCommand, String>
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let args: Vec<String> = args.skip(1).collect();
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliCommand::Version);
    }

    let mut limit = crate::resources::DEFAULT_PAGE_SIZE;
    let mut words = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--limit" | "-n" => {
                let value = iter.next().ok_or("--limit needs a value")?;
                limit = match value.parse::<usize>() {
                    Ok(n) if n > 0 => n,
                    _ => return Err(format!("invalid limit '{}'", value)),
                };
            }
            "--help" | "-h" => return Ok(CliCommand::Help),
            flag if flag.starts_with('-') => return Err(format!("unknown flag '{}'", flag)),
            _ => words.push(arg),
        }
    }

    let mut words = words.into_iter();
    let command = match words.next().as_deref() {
        None | Some("feed") => CliCommand::Feed { limit },
        Some("drafts") => CliCommand::Drafts { limit },
        Some("search") => {
            let text = words.by_ref().collect::<Vec<_>>().join(" ");
            if text.trim().is_empty() {
                return Err("search needs some text".to_string());
            }
            return Ok(CliCommand::Search { text, limit });
        }
        Some("categories") => CliCommand::Categories,
        Some("login") => CliCommand::Login,
        Some("logout") => CliCommand::Logout,
        Some("help") => CliCommand::Help,
        Some(other) => return Err(format!("unknown command '{}'", other)),
    };
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument '{}'", extra));
    }
    Ok(command)
}

pub const USAGE: &str = "\
usage: bazaar [COMMAND] [--limit N]

commands:
  feed            newest listings from other sellers (default)
  drafts          your unpublished listings
  search TEXT     search other sellers' listings by title
  categories      list categories
  login           sign in with email and password
  logout          sign out
";
