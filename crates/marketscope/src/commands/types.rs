use colored::*;

use crate::types::ResearchType;

pub fn execute() {
  println!("{}", "Analysis types".bold());
  for analysis_type in ResearchType::ALL {
    let key = format!("{:<16}", analysis_type.key());
    let label = analysis_type.label().dimmed();
    println!("  {} {:<28} {}", key.cyan(), analysis_type.menu_label(), label);
  }
}
