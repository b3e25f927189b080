//! Plain-text rendering of the feed view model.
//!
//! Output is line oriented so it works in a pipe as well as a terminal. With
//! `color` enabled, keyword matches are emphasised with ANSI escapes.
//!
//! ```text
//! feed · keyword "cat" · createdAt desc
//! ─────────────────────────────────────
//! [1] alice · 2024-05-01 12:30 (5m ago)
//!     a cat nap
//!     ▲ 2 (voted)   [yours]
//! ```

use crate::ui::viewmodel::{FeedViewModel, PostCard};
use std::fmt::Write;

const HIGHLIGHT: &str = "\u{001b}[1;33m";
const DIM: &str = "\u{001b}[2m";
const RESET: &str = "\u{001b}[0m";

/// Renders the whole feed. Cards are numbered from 1 in display order.
#[must_use]
pub fn render(vm: &FeedViewModel, color: bool) -> String {
    let mut out = String::new();
    render_header(&mut out, vm);

    if let Some(empty) = &vm.empty_state {
        let _ = writeln!(out, "  {}", empty.message);
        return out;
    }

    for (index, card) in vm.cards.iter().enumerate() {
        render_card(&mut out, index + 1, card, color);
    }
    out
}

fn render_header(out: &mut String, vm: &FeedViewModel) {
    let bar = &vm.search_bar;
    let mut header = format!("feed · {} {}", bar.sort_by, bar.order);
    if !bar.keyword.is_empty() {
        header = format!("feed · keyword \"{}\" · {} {}", bar.keyword, bar.sort_by, bar.order);
    }
    if vm.loading {
        header.push_str(" · loading…");
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "─".repeat(header.chars().count()));
}

fn render_card(out: &mut String, number: usize, card: &PostCard, color: bool) {
    let _ = writeln!(out, "[{number}] {} · {} ({})", card.author, card.created_at, card.age);

    let body = if color {
        highlighted(&card.body, &card.highlight_ranges)
    } else {
        card.body.clone()
    };
    for line in body.lines() {
        let _ = writeln!(out, "    {line}");
    }

    let mut status = format!("    ▲ {}", card.vote_count);
    if card.has_voted {
        status.push_str(" (voted)");
    }
    if card.vote_pending {
        status.push_str(" …");
    }
    if card.is_owner {
        status.push_str("   [yours]");
    }
    if card.saving {
        status.push_str("   saving…");
    }
    let _ = writeln!(out, "{status}");

    if let Some(draft) = &card.draft {
        if color {
            let _ = writeln!(out, "    {DIM}draft: {draft}{RESET}");
        } else {
            let _ = writeln!(out, "    draft: {draft}");
        }
    }
}

/// Wraps the given character ranges in highlight escapes.
fn highlighted(text: &str, ranges: &[(usize, usize)]) -> String {
    if ranges.is_empty() {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + ranges.len() * 12);
    let mut current_pos = 0;

    for &(start, end) in ranges {
        let start = start.min(chars.len());
        let end = end.min(chars.len());
        if start < current_pos || start >= end {
            continue;
        }
        out.extend(&chars[current_pos..start]);
        out.push_str(HIGHLIGHT);
        out.extend(&chars[start..end]);
        out.push_str(RESET);
        current_pos = end;
    }
    out.extend(&chars[current_pos..]);
    out
}
