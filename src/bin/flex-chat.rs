//! Terminal front end for the fitness assistant.
//!
//! Type a message and press enter. `/clear` starts a new session and `/quit`
//! exits. Set `CHAT_API_URL` to point at a relay other than localhost:5000.

use anyhow::Context;
use flex_assistant::chat::Sender;
use flex_assistant::client::{ChatApi, ConversationController, DisplayMessage, HttpChatApi};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn status_line<A: ChatApi>(controller: &ConversationController<A>) -> &'static str {
    if controller.view().api_available {
        "🟢 Gemini AI Active"
    } else {
        "🔴 Offline Mode"
    }
}

fn render(message: &DisplayMessage) -> String {
    let who = match message.sender {
        Sender::Bot => "FLEX.AI",
        Sender::User => "You",
    };
    format!("[{}] {}: {}", message.time_label(), who, message.text)
}

async fn print_from<A: ChatApi>(
    out: &mut tokio::io::Stdout,
    controller: &ConversationController<A>,
    from: usize,
) -> anyhow::Result<()> {
    for message in controller.view().messages.iter().skip(from) {
        out.write_all(format!("{}\n", render(message)).as_bytes())
            .await?;
    }
    out.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let base_url =
        std::env::var("CHAT_API_URL").unwrap_or_else(|_| "http://localhost:5000".into());
    let api = HttpChatApi::new(base_url).context("Failed to build HTTP client")?;

    let mut controller = ConversationController::new(api);
    let mut out = tokio::io::stdout();

    controller.mount().await;
    out.write_all(format!("AI Fitness Assistant  {}\n", status_line(&controller)).as_bytes())
        .await?;
    print_from(&mut out, &controller, 0).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = line.trim().to_owned();
        match command.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                controller.clear().await;
                out.write_all(format!("--- {}\n", status_line(&controller)).as_bytes())
                    .await?;
                print_from(&mut out, &controller, 0).await?;
            }
            _ => {
                let before = controller.view().messages.len();
                controller.set_input(line);
                out.write_all(b"FLEX.AI is typing...\n").await?;
                out.flush().await?;

                let was_available = controller.view().api_available;
                if controller.submit().await {
                    // The user's own line is already on screen.
                    print_from(&mut out, &controller, before + 1).await?;
                    if controller.view().api_available != was_available {
                        out.write_all(format!("--- {}\n", status_line(&controller)).as_bytes())
                            .await?;
                    }
                }
            }
        }
    }

    Ok(())
}
