use crate::frigate::Event;
use crate::pipeline::filter::{normalize_tag, zone_tags};
use chrono::{Local, TimeZone};
use url::Url;

/// Render a unix timestamp in local time
pub fn format_time(ts: f64) -> String {
    let secs = ts.trunc() as i64;
    match Local.timestamp_opt(secs, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        None => format!("{}", ts),
    }
}

/// Confidence as a percentage with six decimals, e.g. `82.500000%`
pub fn format_score(score: f64) -> String {
    format!("{:.6}%", score * 100.0)
}

/// Escape the characters legacy Markdown reads as entity delimiters
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Link to the event list filtered down to this event's camera, label and zones
pub fn event_link(external_url: &str, event: &Event) -> String {
    let base = external_url.trim_end_matches('/');
    let mut url = match Url::parse(&format!("{}/events", base)) {
        Ok(url) => url,
        Err(_) => return format!("{}/events", base),
    };
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("cameras", &event.camera);
        query.append_pair("labels", &event.label);
        if !event.zones.is_empty() {
            query.append_pair("zones", &event.zones.join(","));
        }
    }
    url.to_string()
}

fn hashtag(value: &str) -> String {
    format!("#{}", normalize_tag(value))
}

/// One-line notification used by the watchdog
pub fn short_message(event: &Event) -> String {
    format!(
        "{} detected on {} at {}",
        hashtag(&event.label),
        hashtag(&event.camera),
        format_time(event.start_time)
    )
}

/// Full notification block with deep links back to the NVR UI
pub fn full_message(event: &Event, external_url: &str) -> String {
    let base = external_url.trim_end_matches('/');
    let mut text = String::from("*Event*\n");

    text += &format!("┣*Camera*\n┗ {}\n", hashtag(&event.camera));
    text += &format!("┣*Label*\n┗ {}\n", hashtag(&event.label));

    let sub_labels = event.sub_labels();
    if !sub_labels.is_empty() {
        let tags: Vec<String> = sub_labels.iter().map(|s| hashtag(s)).collect();
        text += &format!("┣*Sub label*\n┗ {}\n", tags.join(" "));
    }

    text += &format!("┣*Start time*\n┗ `{}`\n", format_time(event.start_time));
    match event.ended_at() {
        Some(end) => text += &format!("┣*End time*\n┗ `{}`\n", format_time(end)),
        None => text += "┣*End time*\n┗ `In progress`\n",
    }

    text += &format!("┣*Top score*\n┗ `{}`\n", format_score(event.top_score()));
    text += &format!("┣*Event id*\n┗ `{}`\n", event.id);

    let zones = zone_tags(event);
    if !zones.is_empty() {
        let tags: Vec<String> = zones.iter().map(|z| format!("#{}", z)).collect();
        text += &format!("┣*Zones*\n┗ {}\n", tags.join(" "));
    }

    text += &format!(
        "┣*Event URL*\n┗ {}",
        escape_markdown(&event_link(external_url, event))
    );
    if event.has_snapshot {
        let link = format!("{}/api/events/{}/snapshot.jpg", base, event.id);
        text += &format!("\n┣*Snapshot*\n┗ {}", escape_markdown(&link));
    }
    if event.has_clip {
        let link = format!("{}/api/events/{}/clip.mp4", base, event.id);
        text += &format!("\n┣*Clip*\n┗ {}", escape_markdown(&link));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        serde_json::from_str(
            r#"{"id": "e1", "camera": "front_door", "label": "person", "start_time": 100, "end_time": 0}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0.0), "0.000000%");
        assert_eq!(format_score(0.825), "82.500000%");
    }

    #[test]
    fn test_full_message_in_progress() {
        let text = full_message(&event(), "http://nvr:5000/");
        assert!(text.starts_with("*Event*\n"));
        assert!(text.contains("┗ #frontdoor\n"));
        assert!(text.contains("┗ #person\n"));
        assert!(text.contains("┣*End time*\n┗ `In progress`"));
        assert!(text.contains("┣*Top score*\n┗ `0.000000%`"));
        assert!(text.contains("┣*Event id*\n┗ `e1`"));
        assert!(text.contains("http://nvr:5000/events?cameras=front\\_door&labels=person"));
        assert!(!text.contains("Sub label"));
        assert!(!text.contains("Zones"));
        assert!(!text.contains("clip.mp4"));
    }

    #[test]
    fn test_full_message_finished_with_extras() {
        let mut e = event();
        e.end_time = Some(160.0);
        e.top_score = Some(0.91);
        e.zones = vec!["drive-way".to_string(), "porch 🚪".to_string()];
        e.sub_label = Some(serde_json::json!(["alice", 0.8]));
        e.has_clip = true;

        let text = full_message(&e, "http://nvr:5000");
        assert!(!text.contains("In progress"));
        assert!(text.contains("`91.000000%`"));
        assert!(text.contains("┣*Sub label*\n┗ #alice\n"));
        assert!(text.contains("┣*Zones*\n┗ #driveway #porch\n"));
        assert!(text.contains("http://nvr:5000/api/events/e1/clip.mp4"));
    }

    #[test]
    fn test_short_message_is_one_line() {
        let text = short_message(&event());
        assert!(text.starts_with("#person detected on #frontdoor at "));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_event_link_is_query_encoded() {
        let mut e = event();
        e.zones = vec!["drive way".to_string(), "porch&gate".to_string()];
        assert_eq!(
            event_link("http://nvr:5000/", &e),
            "http://nvr:5000/events?cameras=front_door&labels=person&zones=drive+way%2Cporch%26gate"
        );

        let text = full_message(&e, "http://nvr:5000");
        assert!(text.contains("┗ http://nvr:5000/events?cameras=front\\_door&labels=person&zones=drive+way%2Cporch%26gate"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b*c`d[e]"), "a\\_b\\*c\\`d\\[e]");
        assert_eq!(escape_markdown("plain"), "plain");
    }
}
