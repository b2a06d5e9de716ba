//! Line-oriented chat session on stdin/stdout.

use groundchat_core::{Completer, Error, LinkCategory, PageRenderer, ResourceKind, Role};
use groundchat_local::{Activation, Assistant, FetchMode};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

pub(crate) const HELP: &str = "\
Type a question, or one of:
  /upload PATH                     load a PDF as the active resource
  /link TITLE | URL [| CATEGORY]   save a link (General, Research, Article, Reference, Other)
  /links                           list saved links
  /select N [auto|static|dynamic]  fetch link N and make it the active resource
  /remove N                        delete saved link N
  /resource                        show the active resource
  /history                         show the chat log
  /help                            show this help
  /quit                            leave";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Ask(String),
    Upload(PathBuf),
    Link {
        title: String,
        url: String,
        category: LinkCategory,
    },
    Links,
    Select { index: usize, mode: FetchMode },
    Remove(usize),
    Resource,
    History,
    Help,
    Quit,
    Empty,
}

/// Link numbers are 1-based on the command line.
fn parse_index(s: Option<&str>) -> Result<usize, Error> {
    let s = s
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation("missing link number".to_string()))?;
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(Error::Validation(format!("invalid link number {s:?}"))),
    }
}

pub(crate) fn parse_line(line: &str) -> Result<Command, Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((n, a)) => (n, a.trim()),
        None => (rest, ""),
    };
    match name.to_ascii_lowercase().as_str() {
        "upload" => {
            if arg.is_empty() {
                return Err(Error::Validation("usage: /upload PATH".to_string()));
            }
            Ok(Command::Upload(PathBuf::from(arg)))
        }
        "link" => {
            let mut parts = arg.split('|').map(str::trim);
            let title = parts.next().unwrap_or("").to_string();
            let url = parts.next().unwrap_or("").to_string();
            let category = match parts.next().filter(|c| !c.is_empty()) {
                Some(c) => c.parse::<LinkCategory>()?,
                None => LinkCategory::default(),
            };
            Ok(Command::Link {
                title,
                url,
                category,
            })
        }
        "links" => Ok(Command::Links),
        "select" => {
            let mut parts = arg.split_whitespace();
            let index = parse_index(parts.next())?;
            let mode = match parts.next() {
                Some(m) => m.parse::<FetchMode>()?,
                None => FetchMode::Auto,
            };
            Ok(Command::Select { index, mode })
        }
        "remove" | "delete" => Ok(Command::Remove(parse_index(Some(arg))?)),
        "resource" => Ok(Command::Resource),
        "history" => Ok(Command::History),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(Error::NotSupported(format!(
            "unknown command /{other} (try /help)"
        ))),
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::Error => "error",
    }
}

fn print_activation(act: &Activation) {
    let r = &act.resource;
    match &act.extraction_error {
        Some(e) => println!(
            "Selected link: {} (no page text: {e}; the model only sees the link itself)",
            r.name
        ),
        None if r.is_document() => {
            println!("Loaded document: {} ({} characters)", r.name, r.content_length)
        }
        None => match act.tier {
            Some(tier) => println!(
                "Selected link: {} ({} characters, {tier} fetch)",
                r.name, r.content_length
            ),
            None => println!("Selected link: {} ({} characters)", r.name, r.content_length),
        },
    }
    if !r.content.is_empty() {
        println!("--- preview ---\n{}\n---------------", r.preview());
    }
    if let Some(t) = &act.summary {
        println!("{}: {}", role_label(t.role), t.content);
    }
}

fn print_resource<C: Completer, R: PageRenderer>(a: &Assistant<C, R>) {
    let Some(r) = a.registry().active() else {
        println!("No resource selected");
        return;
    };
    println!("Name: {}", r.name);
    match &r.kind {
        ResourceKind::Document => println!("Type: document"),
        ResourceKind::Link { url, category } => {
            println!("Type: link ({category})");
            println!("URL: {url}");
        }
    }
    println!("Characters available: {}", r.chars_available());
    println!("Full length: {}", r.content_length);
}

/// Run one command. Returns `false` once the session should end.
async fn dispatch<C: Completer, R: PageRenderer>(
    a: &mut Assistant<C, R>,
    cmd: Command,
) -> Result<bool, Error> {
    match cmd {
        Command::Empty => {}
        Command::Quit => return Ok(false),
        Command::Help => println!("{HELP}"),
        Command::Ask(q) => {
            let turn = a.ask(&q).await?;
            println!("{}: {}", role_label(turn.role), turn.content);
        }
        Command::Upload(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| Error::Validation(format!("cannot read {}: {e}", path.display())))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let act = a.upload_document(&name, &bytes).await?;
            print_activation(&act);
        }
        Command::Link {
            title,
            url,
            category,
        } => {
            let link = a.add_link(&title, &url, category)?;
            println!("Saved link: {} [{}]", link.title, link.category);
        }
        Command::Links => {
            let links = a.registry().links();
            if links.is_empty() {
                println!("No saved links.");
            }
            for (i, l) in links.iter().enumerate() {
                println!("{}. [{}] {} <{}>", i + 1, l.category, l.title, l.url);
            }
        }
        Command::Select { index, mode } => {
            let act = a.select_link(index, mode).await?;
            print_activation(&act);
        }
        Command::Remove(index) => {
            let l = a.remove_link(index)?;
            println!("Removed link: {}", l.title);
        }
        Command::Resource => print_resource(a),
        Command::History => {
            if a.session().is_empty() {
                println!("No messages yet.");
            }
            for t in a.session().all() {
                println!("{}: {}", role_label(t.role), t.content);
            }
        }
    }
    Ok(true)
}

pub(crate) async fn run<C: Completer, R: PageRenderer>(
    mut a: Assistant<C, R>,
    interactive: bool,
) -> anyhow::Result<()> {
    if let Some(g) = a.gate() {
        println!("Logged in as {} ({})", g.username(), g.tier());
    }
    if interactive {
        println!("Type /help for commands.");
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("[{}] > ", a.registry().active_name());
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let cmd = match parse_line(&line) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        match dispatch(&mut a, cmd).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(Error::Expired(msg)) => {
                tracing::info!("free demo expired");
                println!("{msg}");
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_questions() {
        assert_eq!(
            parse_line("  what is this?  ").unwrap(),
            Command::Ask("what is this?".to_string())
        );
        assert_eq!(parse_line("   ").unwrap(), Command::Empty);
    }

    #[test]
    fn link_command_splits_on_pipes() {
        assert_eq!(
            parse_line("/link Rust Book | https://doc.rust-lang.org/book/ | reference").unwrap(),
            Command::Link {
                title: "Rust Book".to_string(),
                url: "https://doc.rust-lang.org/book/".to_string(),
                category: LinkCategory::Reference,
            }
        );
        let Command::Link { category, .. } = parse_line("/link A | b").unwrap() else {
            panic!("expected link");
        };
        assert_eq!(category, LinkCategory::General);
        assert!(parse_line("/link A | b | Gossip").is_err());
    }

    #[test]
    fn select_is_one_based_with_optional_mode() {
        assert_eq!(
            parse_line("/select 2 static").unwrap(),
            Command::Select {
                index: 1,
                mode: FetchMode::Static
            }
        );
        assert_eq!(
            parse_line("/select 1").unwrap(),
            Command::Select {
                index: 0,
                mode: FetchMode::Auto
            }
        );
        assert!(parse_line("/select 0").is_err());
        assert!(parse_line("/select").is_err());
        assert!(parse_line("/select 1 turbo").is_err());
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(matches!(parse_line("/frobnicate"), Err(Error::NotSupported(_))));
        assert_eq!(parse_line("/QUIT").unwrap(), Command::Quit);
        assert!(parse_line("/upload").is_err());
    }
}
