//! User guide shown by the web UI and the CLI

use serde::Serialize;

/// Application title
pub const TITLE: &str = "Telegram Disaster Recovery Assistant";

/// Introductory paragraph
pub const INTRO: &str = "This is a Telegram based Disaster Recovery Assist app that uses Named \
Entity Recognition to extract important entities from unstructured text and presents them as a \
table. You need to provide your personal Telegram Bot API token (the API token of the bot that \
is added to the channel as an administrator) to use this app.";

/// Steps to create a bot
pub const CREATE_BOT_STEPS: [&str; 6] = [
    "Download the Telegram app on your device or use the web version.",
    "Open the app and search for the 'BotFather' bot.",
    "Start a chat with the BotFather bot by clicking on the 'START' button.",
    "Type '/newbot' and follow the on-screen instructions to create a new bot.",
    "Choose a name and username for your bot.",
    "Once your bot is created, the BotFather will give you a unique API token.",
];

/// Steps to add the bot to a channel
pub const ADD_TO_CHANNEL_STEPS: [&str; 3] = [
    "Create a new channel or choose an existing one that you want to use the bot in.",
    "Add your bot to the channel as an administrator. Go to the channel settings, click on \
     'Administrators', then 'Add Administrator', search for your bot and add it.",
    "Posts in the channel are now delivered to the bot and appear here after you submit your \
     token.",
];

/// Structured guide for JSON consumers
#[derive(Debug, Clone, Serialize)]
pub struct Guide {
    pub title: &'static str,
    pub intro: &'static str,
    pub create_bot: Vec<&'static str>,
    pub add_to_channel: Vec<&'static str>,
}

pub fn guide() -> Guide {
    Guide {
        title: TITLE,
        intro: INTRO,
        create_bot: CREATE_BOT_STEPS.to_vec(),
        add_to_channel: ADD_TO_CHANNEL_STEPS.to_vec(),
    }
}

/// Guide as plain text with numbered steps
pub fn render_text() -> String {
    let mut out = format!("{TITLE}\n\n{INTRO}\n\nSteps to create a Telegram Bot:\n");
    for (i, step) in CREATE_BOT_STEPS.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out.push_str("\nSteps to add your Telegram bot to your channel as an administrator:\n");
    for (i, step) in ADD_TO_CHANNEL_STEPS.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out
}
