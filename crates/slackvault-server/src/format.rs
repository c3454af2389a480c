//! Rendering helpers: Slack mrkdwn to HTML, and timestamp display.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, TimeZone};
use regex::{Captures, Regex};

use slackvault_db::models::UserRow;
use slackvault_types::SlackTs;

/// `<...>` tokens after escaping: links, mentions, channel refs.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&lt;(.*?)&gt;").unwrap());
static FENCED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```\n?(.*?)```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w*])\*([^*\n]+)\*").unwrap());
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w_])_([^_\n]+)_").unwrap());
static STRIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w~])~([^~\n]+)~").unwrap());

/// Escapes the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turns a stored message body into safe HTML.
///
/// Slack sends `&`, `<` and `>` pre-escaped, so the body is unescaped once
/// before being escaped for display. Angle-bracket tokens become links or
/// mentions; the remaining text gets the mrkdwn styles.
pub fn format_message_text(text: &str, users: &HashMap<String, UserRow>) -> String {
    if text.is_empty() {
        return String::new();
    }

    let raw = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    let escaped = escape_html(&raw);

    let mut out = String::with_capacity(escaped.len());
    let mut last = 0;
    for caps in TOKEN.captures_iter(&escaped) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&style_plain(&escaped[last..whole.start()]));
        out.push_str(&render_token(&caps[1], users));
        last = whole.end();
    }
    out.push_str(&style_plain(&escaped[last..]));

    out.replace('\n', "<br>")
}

fn render_token(inner: &str, users: &HashMap<String, UserRow>) -> String {
    let (target, label) = match inner.split_once('|') {
        Some((t, l)) => (t, Some(l).filter(|l| !l.is_empty())),
        None => (inner, None),
    };

    if let Some(user_id) = target.strip_prefix('@') {
        // Display names come from the users table, not the escaped body.
        let name = match users
            .get(user_id)
            .map(|u| u.display_name.as_str())
            .filter(|n| !n.is_empty())
        {
            Some(display) => escape_html(display),
            None => label.unwrap_or(user_id).to_string(),
        };
        return format!(r#"<span class="mention">@{}</span>"#, name);
    }

    if let Some(channel_id) = target.strip_prefix('#') {
        return format!(
            r#"<span class="channel-ref">#{}</span>"#,
            label.unwrap_or(channel_id)
        );
    }

    if let Some(special) = target.strip_prefix('!') {
        let name = label
            .map(|l| l.trim_start_matches('@'))
            .unwrap_or_else(|| special.split('^').next().unwrap_or(special));
        return format!(r#"<span class="mention">@{}</span>"#, name);
    }

    if ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| target.starts_with(scheme))
    {
        return format!(
            r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
            target,
            label.unwrap_or(target)
        );
    }

    format!("&lt;{}&gt;", style_plain(inner))
}

/// Applies mrkdwn styles to already-escaped text.
fn style_plain(segment: &str) -> String {
    if segment.is_empty() {
        return String::new();
    }
    let s = FENCED.replace_all(segment, "<pre><code>$1</code></pre>");
    let s = INLINE_CODE.replace_all(&s, "<code>$1</code>");
    let s = BOLD.replace_all(&s, |c: &Captures| format!("{}<strong>{}</strong>", &c[1], &c[2]));
    let s = ITALIC.replace_all(&s, |c: &Captures| format!("{}<em>{}</em>", &c[1], &c[2]));
    let s = STRIKE.replace_all(&s, |c: &Captures| format!("{}<del>{}</del>", &c[1], &c[2]));
    s.into_owned()
}

// -- Time --

/// `9:05 AM` style clock time. Unparseable timestamps are returned as-is.
pub fn format_time<Tz: TimeZone>(ts: &SlackTs, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match ts.to_datetime() {
        Some(dt) => dt
            .with_timezone(tz)
            .format("%I:%M %p")
            .to_string()
            .trim_start_matches('0')
            .to_string(),
        None => ts.to_string(),
    }
}

/// Full tooltip form, e.g. `Mar 04, 2024 9:05 AM`.
pub fn format_timestamp<Tz: TimeZone>(ts: &SlackTs, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match ts.to_datetime() {
        Some(dt) => {
            let local = dt.with_timezone(tz);
            format!("{} {}", local.format("%b %d, %Y"), format_time(ts, tz))
        }
        None => ts.to_string(),
    }
}

pub fn local_date<Tz: TimeZone>(ts: &SlackTs, tz: &Tz) -> Option<NaiveDate> {
    ts.to_datetime().map(|dt| dt.with_timezone(tz).date_naive())
}

/// Divider label between days: `Today`, `Yesterday`, or `Monday, March 04, 2024`.
pub fn date_divider(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.pred_opt() {
        "Yesterday".to_string()
    } else {
        date.format("%A, %B %d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn users() -> HashMap<String, UserRow> {
        let mut map = HashMap::new();
        map.insert(
            "U1".to_string(),
            UserRow {
                id: "U1".into(),
                name: "jdoe".into(),
                display_name: "Jo".into(),
                avatar_local: None,
            },
        );
        map
    }

    fn fmt(text: &str) -> String {
        format_message_text(text, &users())
    }

    #[test]
    fn plain_text_is_escaped() {
        assert_eq!(fmt("a \"quote\""), "a &quot;quote&quot;");
        assert_eq!(fmt("<script>"), "&lt;script&gt;");
    }

    #[test]
    fn slack_entities_are_not_double_escaped() {
        assert_eq!(fmt("1 &lt; 2 &amp;&amp; 3 &gt; 2"), "1 &lt; 2 &amp;&amp; 3 &gt; 2");
    }

    #[test]
    fn links_with_and_without_labels() {
        assert_eq!(
            fmt("see <https://example.com|the docs>"),
            r#"see <a href="https://example.com" target="_blank" rel="noopener">the docs</a>"#
        );
        assert_eq!(
            fmt("<https://example.com/a_b_c>"),
            r#"<a href="https://example.com/a_b_c" target="_blank" rel="noopener">https://example.com/a_b_c</a>"#
        );
    }

    #[test]
    fn link_query_strings_survive() {
        let html = fmt("<https://example.com/?a=1&amp;b=2>");
        assert!(html.contains(r#"href="https://example.com/?a=1&amp;b=2""#));
    }

    #[test]
    fn mentions_use_display_names() {
        assert_eq!(fmt("hi <@U1>"), r#"hi <span class="mention">@Jo</span>"#);
        assert_eq!(fmt("<@U9>"), r#"<span class="mention">@U9</span>"#);
        assert_eq!(fmt("<@U9|sam>"), r#"<span class="mention">@sam</span>"#);
        assert_eq!(fmt("<!here>"), r#"<span class="mention">@here</span>"#);
    }

    #[test]
    fn display_names_are_escaped() {
        let mut users = users();
        users.insert(
            "U2".to_string(),
            UserRow {
                id: "U2".into(),
                name: "mallory".into(),
                display_name: "<img src=x onerror=alert(1)>".into(),
                avatar_local: None,
            },
        );
        assert_eq!(
            format_message_text("hi <@U2>", &users),
            r#"hi <span class="mention">@&lt;img src=x onerror=alert(1)&gt;</span>"#
        );
    }

    #[test]
    fn channel_refs_use_label() {
        assert_eq!(
            fmt("<#C123|general>"),
            r#"<span class="channel-ref">#general</span>"#
        );
    }

    #[test]
    fn mrkdwn_styles() {
        assert_eq!(fmt("*bold*"), "<strong>bold</strong>");
        assert_eq!(fmt("an _em_ word"), "an <em>em</em> word");
        assert_eq!(fmt("~gone~"), "<del>gone</del>");
        assert_eq!(fmt("run `ls`"), "run <code>ls</code>");
        assert_eq!(fmt("snake_case_name"), "snake_case_name");
    }

    #[test]
    fn fenced_code_and_newlines() {
        assert_eq!(
            fmt("before\n```\nlet x = 1;\n```"),
            "before<br><pre><code>let x = 1;<br></code></pre>"
        );
    }

    #[test]
    fn clock_time_is_twelve_hour() {
        // 2023-11-14 22:13:20 UTC
        let ts = SlackTs::new("1700000000.000100");
        assert_eq!(format_time(&ts, &Utc), "10:13 PM");
        assert_eq!(format_timestamp(&ts, &Utc), "Nov 14, 2023 10:13 PM");
        assert_eq!(format_time(&SlackTs::new("bogus"), &Utc), "bogus");
    }

    #[test]
    fn dividers() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(date_divider(today, today), "Today");
        assert_eq!(
            date_divider(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), today),
            "Yesterday"
        );
        assert_eq!(
            date_divider(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), today),
            "Thursday, February 01, 2024"
        );
    }
}
