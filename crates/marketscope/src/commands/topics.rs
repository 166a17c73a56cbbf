use colored::*;

use crate::form::EXAMPLE_TOPICS;

pub fn execute() {
  println!("{}", "Example topics".bold());
  for (i, topic) in EXAMPLE_TOPICS.iter().enumerate() {
    println!("  {} {}", format!("{}.", i + 1).dimmed(), topic);
  }
  println!();
  println!("Use one with `marketscope analyze --example <N> --type <TYPE>`");
}
