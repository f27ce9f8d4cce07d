use crate::board::BoardBox;
use crate::clock::display_time;
use crate::escape::html_escape;
use crate::protocol::format_duration;

/// Path of the detail page for a box.
pub fn detail_path(box_id: &str) -> String {
    format!("/box/{}", box_id)
}

/// HTML fragment for one box on the board.
pub fn render_box(state: &BoardBox) -> String {
    let id = html_escape(&state.id);
    let mut class = state.level.as_str().to_string();
    if !state.size.is_empty() {
        class.push(' ');
        class.push_str(&html_escape(&state.size));
    }

    let mut markup = format!(
        "<div id='{id}' class='{class} box'>\
         <p class='title'><a href='{href}'>{title}</a></p>\
         <p class='message'>{message}</p>\
         <p class='lastUpdated'>{updated}</p>",
        id = id,
        class = class,
        href = html_escape(&detail_path(&state.id)),
        title = html_escape(state.title()),
        message = html_escape(&state.last_message),
        updated = display_time(state.last_update),
    );
    if !state.max_tbu.is_zero() {
        markup.push_str(&format!(
            "<p class='maxTBU'>{}</p>",
            format_duration(state.max_tbu)
        ));
    }
    if !state.expire_after.is_zero() {
        markup.push_str(&format!(
            "<p class='expireAfter'>{}</p>",
            format_duration(state.expire_after)
        ));
    }
    markup.push_str("</div>");
    markup
}
