use crate::models::Poll;

// One option's standing in a poll, as shown to the voter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyRow {
    pub option_id: String,
    pub label: String,
    pub votes: u64,
    pub percentage: u32,
    pub is_leading: bool,
    pub voted_by_me: bool,
}

/// Share of `total` as a rounded whole percentage; zero when nothing was cast.
pub fn percentage(votes: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((votes as f64 * 100.0) / total as f64).round() as u32
}

pub fn tally(poll: &Poll, my_votes: &[String]) -> Vec<TallyRow> {
    let max_votes = poll.options.iter().map(|option| option.votes).max().unwrap_or(0);

    poll.options
        .iter()
        .map(|option| TallyRow {
            option_id: option.id.clone(),
            label: option.label(),
            votes: option.votes,
            percentage: percentage(option.votes, poll.total_votes),
            // Ties all lead
            is_leading: poll.total_votes > 0 && option.votes == max_votes,
            voted_by_me: my_votes.contains(&option.id),
        })
        .collect()
}

// Text rendering for the console
pub fn summary(poll: &Poll, my_votes: &[String]) -> String {
    let mut summary = format!("{} [{}]\n", poll.question_text(), poll.id);

    for row in tally(poll, my_votes) {
        let marker = if row.voted_by_me { " ✓ your vote" } else { "" };
        let line = if row.is_leading {
            format!("  **{}** ({}): {} vote{} ({}%){}", row.label, row.option_id, row.votes, plural(row.votes), row.percentage, marker)
        } else {
            format!("  {} ({}): {} vote{} ({}%){}", row.label, row.option_id, row.votes, plural(row.votes), row.percentage, marker)
        };
        summary.push_str(&line);
        summary.push('\n');
    }

    let mode = if poll.is_multiple_vote_mode() { "Multiple Answer" } else { "Single Answer" };
    let status = if poll.is_active { "Active" } else { "Inactive" };
    summary.push_str(&format!("\n{} vote{} · {} · {}", poll.total_votes, plural(poll.total_votes), mode, status));
    summary
}

fn plural(count: u64) -> &'static str {
    if count == 1 { "" } else { "s" }
}
