//! Telegram command and message handlers.
//!
//! Every adapter failure is caught here at the dispatch boundary and turned
//! into a templated reply naming the failed service; nothing propagates to
//! the dispatcher as a crash.

use crate::analysis::{AnalysisMode, AnalysisRequest, MediaKind};
use crate::bot::messaging::{send_long_message, truncate_caption_html, TELEGRAM_CAPTION_LIMIT};
use crate::bot::state::State;
use crate::bot::AppServices;
use crate::config::{ANALYSIS_CHAR_BUDGET, MAX_UPLOAD_BYTES};
use crate::services::youtube::VideoRecord;
use crate::utils::{
    format_error_message, retry_telegram_operation, sanitize_markup, truncate_with_ellipsis,
};
use anyhow::{anyhow, Result};
use html_escape::encode_text;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InputFile, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use url::Url;

/// Dialogue handle shared by all message handlers.
pub type BotDialogue = Dialogue<State, InMemStorage<State>>;

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Show the welcome message.")]
    Start,
    #[command(description = "Show help for all features.")]
    Help,
    #[command(description = "Ask the AI assistant.")]
    Ai(String),
    #[command(description = "Search YouTube videos.")]
    Youtube(String),
    #[command(description = "Look up a movie.")]
    Movie(String),
    #[command(description = "Remove the background from an image.")]
    Removebg,
}

/// Safe extraction of user ID from a message. Returns 0 when missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// `/start` handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: &Bot, msg: &Message) -> Result<()> {
    info!("User {} initiated /start.", get_user_id_safe(msg));

    let text = "🤖 <b>Welcome to the Omnibot assistant!</b>\n\n\
         I can help you with:\n\n\
         🧠 <b>AI Assistant</b> — /ai &lt;your message&gt;\n\
         🎥 <b>YouTube Search</b> — /youtube &lt;search query&gt;\n\
         🎬 <b>Movie Search</b> — /movie &lt;movie name&gt;\n\
         🖼 <b>Remove Background</b> — /removebg, then upload an image\n\
         👁 <b>Image/Video Analysis</b> — send me any image or video\n\n\
         Other commands:\n\
         /help — show detailed help\n\n\
         Just send me a message or upload an image/video to get started!";

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// `/help` handler
///
/// # Errors
///
/// Returns an error if the help message cannot be sent.
pub async fn help(bot: &Bot, msg: &Message) -> Result<()> {
    let text = "🤖 <b>Bot Commands &amp; Features</b>\n\n\
         <b>🧠 AI Assistant</b>\n\
         /ai &lt;your question&gt; — chat with the AI\n\
         Example: <code>/ai What is quantum computing?</code>\n\n\
         <b>🎥 YouTube Search</b>\n\
         /youtube &lt;search query&gt; — find YouTube videos\n\
         Example: <code>/youtube rust tutorials</code>\n\n\
         <b>🎬 Movie Search</b>\n\
         /movie &lt;movie name&gt; — get movie details\n\
         Example: <code>/movie The Matrix</code>\n\n\
         <b>🖼 Background Removal</b>\n\
         1. Send /removebg\n\
         2. Upload an image\n\
         3. Get the image with the background removed\n\n\
         <b>👁 Image/Video Analysis</b>\n\
         Send any image or video directly and get an AI-powered analysis.\n\n\
         💡 You can send images and videos without any command; uploads are \
         analyzed automatically.";

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// `/ai` handler
///
/// # Errors
///
/// Returns an error if a reply cannot be sent.
pub async fn ai(bot: &Bot, msg: &Message, services: &AppServices, text: &str) -> Result<()> {
    let prompt = text.trim();
    if prompt.is_empty() {
        bot.send_message(
            msg.chat.id,
            "Please provide a message after the /ai command.\n\
             Example: <code>/ai What is artificial intelligence?</code>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    match services.gemini.generate_text(prompt).await {
        Ok(response) => {
            send_long_message(bot, msg.chat.id, &format!("🧠 AI Response:\n\n{response}")).await?;
        }
        Err(e) => {
            warn!("AI assistant request failed: {e}");
            bot.send_message(msg.chat.id, format_error_message("AI Assistant", &e.to_string()))
                .await?;
        }
    }
    Ok(())
}

/// `/youtube` handler
///
/// # Errors
///
/// Returns an error if a reply cannot be sent.
pub async fn youtube_search(
    bot: &Bot,
    msg: &Message,
    services: &AppServices,
    query: &str,
) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bot.send_message(
            msg.chat.id,
            "Please provide a search query after the /youtube command.\n\
             Example: <code>/youtube rust programming</code>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    match services.youtube.search_videos(query).await {
        Ok(videos) if videos.is_empty() => {
            bot.send_message(msg.chat.id, "No videos found for your search query.")
                .await?;
        }
        Ok(videos) => {
            bot.send_message(msg.chat.id, render_video_results(query, &videos))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(e) => {
            warn!("YouTube search failed: {e}");
            bot.send_message(
                msg.chat.id,
                format_error_message("YouTube Search", &e.to_string()),
            )
            .await?;
        }
    }
    Ok(())
}

fn render_video_results(query: &str, videos: &[VideoRecord]) -> String {
    let mut out = format!("🎥 <b>YouTube results for:</b> {}\n\n", encode_text(query));
    for (i, video) in videos.iter().enumerate() {
        out.push_str(&format!(
            "<b>{}. {}</b>\n👤 {}\n👀 {} views\n🔗 {}\n\n",
            i + 1,
            encode_text(&video.title),
            encode_text(&video.channel),
            video.views,
            video.url()
        ));
    }
    out.trim_end().to_string()
}

/// `/movie` handler
///
/// # Errors
///
/// Returns an error if a reply cannot be sent.
pub async fn movie_lookup(
    bot: &Bot,
    msg: &Message,
    services: &AppServices,
    name: &str,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bot.send_message(
            msg.chat.id,
            "Please provide a movie name after the /movie command.\n\
             Example: <code>/movie The Matrix</code>",
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    match services.tmdb.search_movie(name).await {
        Ok(None) => {
            bot.send_message(
                msg.chat.id,
                format!("No movie found for: {}", encode_text(name)),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        Ok(Some(movie)) => {
            let details = render_movie_details(&movie);
            let poster = movie
                .poster_url
                .as_deref()
                .and_then(|u| Url::parse(u).ok());
            match poster {
                Some(url) => {
                    bot.send_photo(msg.chat.id, InputFile::url(url))
                        .caption(truncate_caption_html(&details, TELEGRAM_CAPTION_LIMIT))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                None => {
                    bot.send_message(msg.chat.id, details)
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
            }
        }
        Err(e) => {
            warn!("Movie lookup failed: {e}");
            bot.send_message(
                msg.chat.id,
                format_error_message("Movie Search", &e.to_string()),
            )
            .await?;
        }
    }
    Ok(())
}

fn render_movie_details(movie: &crate::services::tmdb::MovieRecord) -> String {
    let genres = if movie.genres.is_empty() {
        "Unknown".to_string()
    } else {
        movie.genres.join(", ")
    };
    let runtime = movie
        .runtime
        .map_or_else(|| "Unknown".to_string(), |r| format!("{r} minutes"));
    let cast = if movie.cast.is_empty() {
        "Unknown".to_string()
    } else {
        movie.cast.join(", ")
    };
    // Keep the overview short so the whole block fits a photo caption.
    let overview = truncate_with_ellipsis(&movie.overview, 500);

    format!(
        "🎬 <b>{}</b> ({})\n\n\
         ⭐ <b>Rating:</b> {}/10\n\
         📅 <b>Release date:</b> {}\n\
         🎭 <b>Genres:</b> {}\n\
         ⏱ <b>Runtime:</b> {}\n\
         🎞 <b>Director:</b> {}\n\
         👥 <b>Cast:</b> {}\n\
         💰 <b>Budget:</b> {} | <b>Revenue:</b> {}\n\n\
         📝 <b>Overview:</b>\n{}",
        encode_text(&movie.title),
        encode_text(&movie.year),
        movie.rating,
        encode_text(&movie.release_date),
        encode_text(&genres),
        runtime,
        encode_text(&movie.director),
        encode_text(&cast),
        movie.budget,
        movie.revenue,
        encode_text(&overview)
    )
}

/// `/removebg` handler: arms the one-shot session flag.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent or the dialogue state
/// cannot be updated.
pub async fn removebg(bot: &Bot, msg: &Message, dialogue: &BotDialogue) -> Result<()> {
    dialogue
        .update(State::AwaitingRemoveBgImage)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    bot.send_message(
        msg.chat.id,
        "🖼 <b>Background Removal Service</b>\n\n\
         Upload an image and I'll remove the background for you!\n\n\
         📝 <b>Supported formats:</b> JPG, PNG, GIF, BMP, WebP\n\
         📏 <b>Max file size:</b> 20MB",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

/// Photo upload handler: background removal when the session flag (or a
/// `/removebg` caption) requests it, general analysis otherwise.
///
/// # Errors
///
/// Returns an error if Telegram refuses to send a reply.
pub async fn handle_photo(
    bot: &Bot,
    msg: &Message,
    services: &AppServices,
    dialogue: &BotDialogue,
) -> Result<()> {
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        bot.send_message(msg.chat.id, "Unable to process the uploaded file.")
            .await?;
        return Ok(());
    };

    // The flag covers exactly one upload, even one that is rejected below.
    let awaiting = take_removebg_flag(dialogue).await?;

    if photo.file.size > MAX_UPLOAD_BYTES {
        bot.send_message(msg.chat.id, "File is too large. The maximum size is 20MB.")
            .await?;
        return Ok(());
    }

    let caption_requests_removal = msg
        .caption()
        .is_some_and(|c| c.to_lowercase().contains("/removebg"));

    let mode = if awaiting || caption_requests_removal {
        AnalysisMode::RemoveBackground
    } else {
        AnalysisMode::Analyze
    };

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    let media = match download_telegram_file(bot, photo.file.id.clone()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Photo download failed: {e}");
            bot.send_message(
                msg.chat.id,
                format_error_message("File Analysis", &e.to_string()),
            )
            .await?;
            return Ok(());
        }
    };

    let request = AnalysisRequest {
        media,
        kind: MediaKind::Image,
        mode,
    };

    match request.mode {
        AnalysisMode::RemoveBackground => {
            process_background_removal(bot, msg, services, &request.media).await
        }
        AnalysisMode::Analyze => {
            let analysis = services.analyzer.analyze(&request).await;
            bot.send_message(msg.chat.id, render_analysis(request.kind, &analysis))
                .await?;
            Ok(())
        }
    }
}

async fn process_background_removal(
    bot: &Bot,
    msg: &Message,
    services: &AppServices,
    image: &[u8],
) -> Result<()> {
    match services.removebg.remove_background(image).await {
        Ok(result) => {
            bot.send_photo(
                msg.chat.id,
                InputFile::memory(result).file_name("no_background.png"),
            )
            .caption("🖼 Background removed successfully!")
            .await?;
        }
        Err(e) => {
            warn!("Background removal failed: {e}");
            bot.send_message(
                msg.chat.id,
                format_error_message("Background Removal", &e.to_string()),
            )
            .await?;
        }
    }
    Ok(())
}

/// Video upload handler: analysis only; a pending removal request on a
/// video is rejected and the flag still cleared.
///
/// # Errors
///
/// Returns an error if Telegram refuses to send a reply.
pub async fn handle_video(
    bot: &Bot,
    msg: &Message,
    services: &AppServices,
    dialogue: &BotDialogue,
) -> Result<()> {
    let Some(video) = msg.video() else {
        bot.send_message(msg.chat.id, "Unable to process the uploaded file.")
            .await?;
        return Ok(());
    };

    if take_removebg_flag(dialogue).await? {
        bot.send_message(
            msg.chat.id,
            "Background removal only works with images, not videos.",
        )
        .await?;
        return Ok(());
    }

    if video.file.size > MAX_UPLOAD_BYTES {
        bot.send_message(msg.chat.id, "File is too large. The maximum size is 20MB.")
            .await?;
        return Ok(());
    }

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    let media = match download_telegram_file(bot, video.file.id.clone()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Video download failed: {e}");
            bot.send_message(
                msg.chat.id,
                format_error_message("File Analysis", &e.to_string()),
            )
            .await?;
            return Ok(());
        }
    };

    let request = AnalysisRequest {
        media,
        kind: MediaKind::Video,
        mode: AnalysisMode::Analyze,
    };
    let analysis = services.analyzer.analyze(&request).await;
    bot.send_message(msg.chat.id, render_analysis(request.kind, &analysis))
        .await?;
    Ok(())
}

/// Free-text handler: falls back to the AI assistant.
///
/// # Errors
///
/// Returns an error if a reply cannot be sent.
pub async fn handle_text(bot: &Bot, msg: &Message, services: &AppServices) -> Result<()> {
    let text = msg.text().unwrap_or("").trim();
    if text.is_empty() {
        return Ok(());
    }

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    match services.gemini.generate_text(text).await {
        Ok(response) => {
            send_long_message(bot, msg.chat.id, &format!("🧠 {response}")).await?;
        }
        Err(e) => {
            warn!("Free-text AI request failed: {e}");
            bot.send_message(
                msg.chat.id,
                "I'm having trouble processing your message right now. \
                 You can try using specific commands like /ai, /youtube, or /movie.",
            )
            .await?;
        }
    }
    Ok(())
}

/// Reads and clears the one-shot background-removal flag in a single step,
/// so every exit path of an upload handler observes a cleared flag.
async fn take_removebg_flag(dialogue: &BotDialogue) -> Result<bool> {
    let awaiting = matches!(
        dialogue.get().await?.unwrap_or_default(),
        State::AwaitingRemoveBgImage
    );
    if awaiting {
        dialogue
            .update(State::Idle)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;
    }
    Ok(awaiting)
}

/// Sanitizes and truncates analysis text, then adds the kind heading.
fn render_analysis(kind: MediaKind, analysis: &str) -> String {
    let cleaned = sanitize_markup(analysis);
    let clipped = truncate_with_ellipsis(cleaned.trim(), ANALYSIS_CHAR_BUDGET);
    format!("👁 {} Analysis:\n\n{}", kind.label(), clipped)
}

/// Downloads a Telegram file into memory with retry on transient failures.
async fn download_telegram_file(bot: &Bot, file_id: FileId) -> Result<Vec<u8>> {
    retry_telegram_operation(|| async {
        let file = bot.get_file(file_id.clone()).await?;
        let mut buf = Vec::new();
        bot.download_file(&file.path, &mut buf).await?;
        Ok(buf)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tmdb::MovieRecord;
    use teloxide::types::ChatId;

    #[tokio::test]
    async fn test_take_removebg_flag_clears_after_one_read() {
        let storage = InMemStorage::<State>::new();
        let dialogue = BotDialogue::new(storage, ChatId(1));

        dialogue
            .update(State::AwaitingRemoveBgImage)
            .await
            .expect("update");
        // First read consumes the flag; the second sees it cleared, so a
        // rejected upload cannot leave the request armed.
        assert!(take_removebg_flag(&dialogue).await.expect("first read"));
        assert!(!take_removebg_flag(&dialogue).await.expect("second read"));
        assert_eq!(dialogue.get().await.expect("state"), Some(State::Idle));
    }

    #[test]
    fn test_render_analysis_sanitizes_and_truncates() {
        let narrative = format!("*bold* [link] {}", "a".repeat(5000));
        let rendered = render_analysis(MediaKind::Image, &narrative);

        assert!(rendered.starts_with("👁 Image Analysis:\n\n"));
        assert!(!rendered.contains('*'));
        assert!(!rendered.contains('['));
        assert!(rendered.ends_with("..."));

        let body = rendered.trim_start_matches("👁 Image Analysis:\n\n");
        assert_eq!(body.chars().count(), ANALYSIS_CHAR_BUDGET + 3);
    }

    #[test]
    fn test_render_analysis_short_text_untouched() {
        let rendered = render_analysis(MediaKind::Video, "A short clip.");
        assert_eq!(rendered, "👁 Video Analysis:\n\nA short clip.");
    }

    #[test]
    fn test_render_video_results_escapes_html() {
        let videos = vec![VideoRecord {
            video_id: "abc".to_string(),
            title: "Rust <Intro>".to_string(),
            channel: "Tutorials & More".to_string(),
            description: String::new(),
            published_at: String::new(),
            thumbnail: String::new(),
            views: "1.5K".to_string(),
            likes: "0".to_string(),
            comments: "0".to_string(),
        }];
        let out = render_video_results("rust", &videos);
        assert!(out.contains("Rust &lt;Intro&gt;"));
        assert!(out.contains("Tutorials &amp; More"));
        assert!(out.contains("👀 1.5K views"));
        assert!(out.contains("https://youtube.com/watch?v=abc"));
    }

    #[test]
    fn test_render_movie_details_defaults() {
        let movie = MovieRecord {
            title: "Solaris".to_string(),
            year: "1972".to_string(),
            release_date: "1972-03-20".to_string(),
            rating: 8.0,
            runtime: None,
            genres: Vec::new(),
            overview: "A psychologist is sent to a space station.".to_string(),
            poster_url: None,
            cast: Vec::new(),
            director: "Andrei Tarkovsky".to_string(),
            budget: "Unknown".to_string(),
            revenue: "Unknown".to_string(),
            vote_count: 100,
        };
        let out = render_movie_details(&movie);
        assert!(out.contains("<b>Solaris</b> (1972)"));
        assert!(out.contains("Genres:</b> Unknown"));
        assert!(out.contains("Runtime:</b> Unknown"));
        assert!(out.contains("Cast:</b> Unknown"));
        assert!(out.contains("Andrei Tarkovsky"));
    }
}
