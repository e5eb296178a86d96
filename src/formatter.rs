//! Renders resolved activity into the text block shown to subscribers.

use crate::resolver::LatestActivity;

/// Four fixed lines: topic, author, date, content preview.
pub fn make_description(activity: &LatestActivity) -> String {
    format!(
        "Тема: {}\nПользователь: {}\nДата: {}\nСодержание: {}",
        activity.title,
        activity.user_name,
        activity.created_at.format("%Y-%m-%d %H:%M"),
        activity.preview
    )
}
