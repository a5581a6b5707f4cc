// src/research/summary.rs
//! Short markdown digest of a research result for humans.

use crate::research::result::ResearchResult;

pub fn get_summary(result: &ResearchResult) -> String {
    let c = &result.consolidated;
    let mut parts: Vec<String> = Vec::new();

    let name = if c.name.is_empty() {
        "Unknown Company"
    } else {
        c.name.as_str()
    };
    parts.push(format!("**{name}**"));

    if !c.description.is_empty() {
        parts.push(c.description.clone());
    }

    let mut facts = Vec::new();
    if let Some(f) = c.founded.as_ref().filter(|v| !v.is_empty()) {
        facts.push(format!("Founded: {f}"));
    }
    if let Some(e) = c.employees.as_ref().filter(|v| !v.is_empty()) {
        facts.push(format!("Employees: {e}"));
    }
    if !c.industry.is_empty() {
        facts.push(format!("Industry: {}", c.industry));
    }
    if !facts.is_empty() {
        let lines: Vec<String> = facts.iter().map(|f| format!("• {f}")).collect();
        parts.push(format!("\n**Key Facts:**\n{}", lines.join("\n")));
    }

    if let Some(latest) = result.news.first() {
        parts.push(format!("\n**Recent News:** {} articles found", result.news.len()));
        parts.push(format!("Latest: {}", latest.title));
    }

    parts.join("\n\n")
}
