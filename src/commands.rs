/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Location the command opens, if it navigates
  pub path: Option<&'static str>,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "products",
    aliases: &["p", "catalog", "shop"],
    description: "Browse the catalog",
    path: Some("/products"),
  },
  Command {
    name: "cart",
    aliases: &["c", "basket"],
    description: "Your shopping cart",
    path: Some("/cart"),
  },
  Command {
    name: "admin-products",
    aliases: &["ap", "admin"],
    description: "Manage products",
    path: Some("/admin/products"),
  },
  Command {
    name: "admin-models",
    aliases: &["am", "models"],
    description: "Manage product models",
    path: Some("/admin/product-models"),
  },
  Command {
    name: "admin-comments",
    aliases: &["ac", "comments", "reviews"],
    description: "Moderate comments",
    path: Some("/admin/comments"),
  },
  Command {
    name: "admin-tags",
    aliases: &["at", "tags"],
    description: "Manage tags",
    path: Some("/admin/tags"),
  },
  Command {
    name: "admin-sales",
    aliases: &["as", "sales", "discounts"],
    description: "Manage sales",
    path: Some("/admin/sales"),
  },
  Command {
    name: "login",
    aliases: &["signin"],
    description: "Sign in with a session token",
    path: Some("/login"),
  },
  Command {
    name: "admin-login",
    aliases: &["al"],
    description: "Sign in to the back office",
    path: Some("/admin-login"),
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Forget the stored session token",
    path: None,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit shopnexus",
    path: None,
  },
];

/// Look up a command by exact name.
pub fn find(name: &str) -> Option<&'static Command> {
  COMMANDS.iter().find(|c| c.name == name)
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
