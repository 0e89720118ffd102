use ratatui::style::Color;

pub struct Theme {
    pub border_focus: Color,
    pub border_inactive: Color,
    pub chat_border: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub accent: Color,
    pub user: Color,
    pub assistant: Color,
    pub muted: Color,
    pub warning: Color,
}

pub const THEME: Theme = Theme {
    border_focus: Color::Cyan,
    border_inactive: Color::DarkGray,
    chat_border: Color::DarkGray,
    selected_fg: Color::Black,
    selected_bg: Color::Cyan,
    accent: Color::LightBlue,
    user: Color::Green,
    assistant: Color::Magenta,
    muted: Color::DarkGray,
    warning: Color::Yellow,
};
