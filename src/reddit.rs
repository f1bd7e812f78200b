use std::time::Duration;

use rand::Rng;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{self, Credentials};
use crate::error::{PipelineError, Result};

/// Posts with less body text than this don't narrate into a watchable
/// video and are skipped outright.
const MIN_BODY_CHARS: usize = 100;

/// The story is picked at random among this many of the top-ranked
/// candidates, so repeat runs don't always grab the same post.
const TOP_POOL: usize = 3;

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    is_self: Option<bool>,
    over_18: Option<bool>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    total_awards_received: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// One selected story, held in memory for the duration of the run.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub body: String,
    pub subreddit: String,
    pub score: i64,
    pub num_comments: u64,
    pub virality: u8,
}

impl Story {
    /// Title then body, separated by a sentence break so the narrator
    /// pauses between them.
    pub fn narration_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}.\n\n{}", self.title, self.body)
        }
    }
}

/// Fetches the subreddit's hot listing and selects one story: candidates
/// are ranked by virality and one of the top three is chosen at random.
pub async fn fetch_story(creds: &Credentials, subreddit: &str, limit: usize) -> Result<Story> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(source_err)?;

    let token = access_token(&client, creds).await?;

    let url = format!("https://oauth.reddit.com/r/{subreddit}/hot.json?limit={limit}&raw_json=1");
    info!("Fetching up to {} hot posts from r/{}", limit, subreddit);
    let listing: RedditListing = client
        .get(&url)
        .bearer_auth(&token)
        .header(USER_AGENT, config::USER_AGENT)
        .send()
        .await
        .map_err(source_err)?
        .error_for_status()
        .map_err(source_err)?
        .json()
        .await
        .map_err(source_err)?;

    let mut candidates: Vec<Story> = listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(is_candidate)
        .map(|post| Story {
            virality: virality_score(
                post.score.max(0) as u64,
                post.num_comments,
                post.total_awards_received,
            ),
            id: post.id,
            title: post.title.trim().to_string(),
            body: post.selftext.trim().to_string(),
            subreddit: subreddit.to_string(),
            score: post.score,
            num_comments: post.num_comments,
        })
        .collect();

    if candidates.is_empty() {
        return Err(PipelineError::SourceUnavailable(format!(
            "no suitable posts found in r/{subreddit}"
        )));
    }
    debug!("{} candidate posts after filtering", candidates.len());

    candidates.sort_by(|a, b| (b.virality, b.score).cmp(&(a.virality, a.score)));
    let pool = candidates.len().min(TOP_POOL);
    let pick = rand::thread_rng().gen_range(0..pool);
    let story = candidates.swap_remove(pick);

    info!(
        "Selected post {} from r/{} ({} upvotes, {} comments, virality {}/9): {}",
        story.id, story.subreddit, story.score, story.num_comments, story.virality, story.title
    );
    Ok(story)
}

/// Application-only OAuth: client-credentials grant authenticated with the
/// app id/secret. The redirect URI is part of the app registration and is
/// passed through on the token request.
async fn access_token(client: &reqwest::Client, creds: &Credentials) -> Result<String> {
    debug!("Requesting application-only access token");
    let params = [
        ("grant_type", "client_credentials"),
        ("redirect_uri", creds.redirect_uri.as_str()),
    ];
    let response: TokenResponse = client
        .post("https://www.reddit.com/api/v1/access_token")
        .basic_auth(&creds.client_id, Some(&creds.client_secret))
        .header(USER_AGENT, config::USER_AGENT)
        .form(&params)
        .send()
        .await
        .map_err(source_err)?
        .error_for_status()
        .map_err(source_err)?
        .json()
        .await
        .map_err(source_err)?;
    Ok(response.access_token)
}

fn is_candidate(post: &RedditPost) -> bool {
    let body = post.selftext.trim();
    post.is_self.unwrap_or(true)
        && !post.over_18.unwrap_or(false)
        && body.len() >= MIN_BODY_CHARS
        && body != "[removed]"
        && body != "[deleted]"
}

/// Scores a post 1-9 from total interactions (upvotes + comments, awards
/// counted tenfold). Thresholds put most active posts at 4-7 and reserve
/// 8-9 for exceptional ones.
fn virality_score(upvotes: u64, comments: u64, awards: u64) -> u8 {
    let interactions = upvotes + comments + awards * 10;
    match interactions {
        50_000.. => 9,
        20_000.. => 8,
        8_000.. => 7,
        3_000.. => 6,
        1_000.. => 5,
        400.. => 4,
        100.. => 3,
        20.. => 2,
        _ => 1,
    }
}

fn source_err(e: reqwest::Error) -> PipelineError {
    PipelineError::SourceUnavailable(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(selftext: &str) -> RedditPost {
        RedditPost {
            id: "abc123".to_string(),
            title: "A title".to_string(),
            selftext: selftext.to_string(),
            is_self: Some(true),
            over_18: Some(false),
            score: 10,
            num_comments: 2,
            total_awards_received: 0,
        }
    }

    #[test]
    fn virality_bands() {
        assert_eq!(virality_score(0, 0, 0), 1);
        assert_eq!(virality_score(20, 0, 0), 2);
        assert_eq!(virality_score(90, 10, 0), 3);
        assert_eq!(virality_score(300, 50, 5), 4);
        assert_eq!(virality_score(900, 100, 0), 5);
        assert_eq!(virality_score(2_500, 400, 10), 6);
        assert_eq!(virality_score(7_000, 1_000, 0), 7);
        assert_eq!(virality_score(19_000, 900, 10), 8);
        assert_eq!(virality_score(49_000, 990, 0), 8);
        assert_eq!(virality_score(49_000, 1_000, 0), 9);
    }

    #[test]
    fn filter_rejects_nsfw_and_thin_posts() {
        let long_body = "x".repeat(MIN_BODY_CHARS);

        let ok = post(&long_body);
        assert!(is_candidate(&ok));

        let mut nsfw = post(&long_body);
        nsfw.over_18 = Some(true);
        assert!(!is_candidate(&nsfw));

        let mut link = post(&long_body);
        link.is_self = Some(false);
        assert!(!is_candidate(&link));

        assert!(!is_candidate(&post("too short")));
        assert!(!is_candidate(&post("[removed]")));
        assert!(!is_candidate(&post("[deleted]")));
    }

    #[test]
    fn listing_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "data": {
                "children": [
                    { "data": { "id": "t3x", "title": "Hello", "selftext": "body" } },
                    { "data": { "id": "t3y", "title": "World", "selftext": "", "score": 12, "num_comments": 3 } }
                ]
            }
        }"#;
        let listing: RedditListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.children.len(), 2);
        let first = &listing.data.children[0].data;
        assert_eq!(first.id, "t3x");
        assert_eq!(first.score, 0);
        assert!(first.is_self.is_none());
    }

    #[test]
    fn narration_text_pauses_between_title_and_body() {
        let story = Story {
            id: "a".into(),
            title: "My story".into(),
            body: "It was a dark night.".into(),
            subreddit: "nosleep".into(),
            score: 1,
            num_comments: 0,
            virality: 1,
        };
        assert_eq!(story.narration_text(), "My story.\n\nIt was a dark night.");
    }
}
