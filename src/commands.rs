/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands, one per data-fetching pattern
pub const COMMANDS: &[Command] = &[
  Command {
    name: "movies",
    aliases: &["m", "movie", "watch"],
    description: "Watch history with optimistic delete",
  },
  Command {
    name: "todos",
    aliases: &["t", "todo", "poll"],
    description: "Auto-refetching todo list",
  },
  Command {
    name: "commodities",
    aliases: &["c", "pages"],
    description: "Page-by-page commodity browsing",
  },
  Command {
    name: "feed",
    aliases: &["f", "infinite"],
    description: "Infinite commodity feed",
  },
  Command {
    name: "reports",
    aliases: &["r", "report", "prefetch"],
    description: "Reports with prefetched details",
  },
  Command {
    name: "dedupe",
    aliases: &["d", "posts"],
    description: "Two panels sharing one request",
  },
  Command {
    name: "home",
    aliases: &["h", "menu"],
    description: "Back to the pattern menu",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit marquee",
  },
];

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|priority| (cmd, priority)))
    .collect();

  matches.sort_by_key(|(_, priority)| *priority);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Rank a command against the input; lower is better, None means no match
fn rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else {
    None
  }
}
