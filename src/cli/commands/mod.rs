pub mod database;
pub mod logging;
pub mod secrets;
pub mod smtp;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_ALLOW_VISIBLE_RESET: &str = "allow-visible-reset";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("auth-global")
        .about("User authentication service")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_ALLOW_VISIBLE_RESET)
                .long(ARG_ALLOW_VISIBLE_RESET)
                .help("Return generated passwords to clients that ask with visible=true")
                .env("ALLOW_VISIBLE_RESET")
                .action(ArgAction::SetTrue),
        );

    let command = database::with_args(command);
    let command = secrets::with_args(command);
    let command = smtp::with_args(command);
    logging::with_args(command)
}
