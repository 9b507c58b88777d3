use regex::Regex;

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// Extract the 11-character video id from a YouTube URL or a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    let bare = Regex::new(r"^[A-Za-z0-9_-]{11}$").ok()?;
    if bare.is_match(input) {
        return Some(input.to_string());
    }

    let re = Regex::new(
        r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/|/live/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .ok()?;
    re.captures(input).map(|caps| caps[1].to_string())
}

pub fn format_number(num: u64) -> String {
    let num_str = num.to_string();
    let chars: Vec<char> = num_str.chars().collect();
    let mut result = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// 3725 -> "1:02:05", 65 -> "1:05"
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
