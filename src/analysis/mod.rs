pub const RECOMMENDATION_LABEL: &str = "Component Store Cleanup Recommended";

/// The first line of the form `<label> : Yes|No` wins.
pub fn parse_cleanup_recommendation(stdout: &str) -> Option<bool> {
    stdout.lines().find_map(parse_marker_line)
}

fn parse_marker_line(line: &str) -> Option<bool> {
    let idx = line.find(RECOMMENDATION_LABEL)?;
    let rest = line[idx + RECOMMENDATION_LABEL.len()..].trim_start();
    let rest = rest.strip_prefix(':')?.trim_start();
    let token: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    match token.as_str() {
        "Yes" => Some(true),
        "No" => Some(false),
        _ => None,
    }
}
