use clap::Parser;

#[derive(Parser, Debug)]
pub struct Args {
    /// Subreddit to pull the story from.
    #[clap(long, default_value = "AmItheAsshole")]
    pub subreddit: String,

    #[clap(long, default_value = "./res/bg.mp4")]
    pub background: String,

    #[clap(long, default_value = "final_video.mp4")]
    pub out: String,

    #[clap(long, default_value = "narration.mp3")]
    pub narration: String,

    /// How many hot posts to consider per run.
    #[clap(long, default_value_t = 25)]
    pub limit: usize,

    /// Max characters per TTS request; the service rejects long inputs.
    #[clap(long, default_value_t = 180)]
    pub chunk_chars: usize,

    /// TTS language code.
    #[clap(long, default_value = "en")]
    pub voice_lang: String,

    /// Accent-selecting domain suffix (com, co.uk, com.au, co.in, ca).
    #[clap(long, default_value = "com")]
    pub voice_tld: String,

    /// Narration tempo multiplier; 1.0 keeps the raw voice speed.
    #[clap(long, default_value_t = 1.5)]
    pub speed: f64,

    /// Trim the story at sentence boundaries so the finished video stays
    /// under this many seconds.
    #[clap(long)]
    pub max_seconds: Option<f64>,
}
