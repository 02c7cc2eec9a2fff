pub mod api;
pub mod deletion;
pub mod pacing;
pub mod retry;


use api::{AuthorFeedPage, BlueskyApiClient};
use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use skyprune_core::{
    record_key, AccountClient, AppConfig, BlueskyApiError, CoreError, Credentials, Post,
    PostDeleter, Session,
};
use tracing::{debug, info};

pub use deletion::DeletionExecutor;
pub use pacing::{PacingConfig, RequestPacer};
pub use retry::{RetryConfig, RetryStrategy};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { session: Session },
}

#[derive(Debug)]
pub struct BlueskyClient {
    api: BlueskyApiClient,
    auth_state: AuthState,
    page_size: u32,
}

impl BlueskyClient {
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        Ok(Self {
            api: BlueskyApiClient::new(config)?,
            auth_state: AuthState::NotAuthenticated,
            page_size: config.page_size,
        })
    }

    pub fn get_auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth_state, AuthState::Authenticated { .. })
    }

    pub fn session(&self) -> Result<&Session, CoreError> {
        match &self.auth_state {
            AuthState::Authenticated { session } => Ok(session),
            AuthState::NotAuthenticated => {
                Err(CoreError::BlueskyApi(BlueskyApiError::NotAuthenticated))
            }
        }
    }

    /// Exchange credentials for a session and keep it for later calls.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<&Session, CoreError> {
        info!("Authenticating as {}", credentials.identifier);
        let response = self
            .api
            .create_session(&credentials.identifier, &credentials.secret)
            .await?;

        self.auth_state = AuthState::Authenticated {
            session: response.into(),
        };
        self.session()
    }

    async fn refresh(&mut self) -> Result<(), CoreError> {
        let refresh_jwt = self.session()?.refresh_jwt.clone();
        let response = self.api.refresh_session(&refresh_jwt).await?;
        self.auth_state = AuthState::Authenticated {
            session: response.into(),
        };
        Ok(())
    }

    async fn author_feed_once(&self, cursor: Option<&str>) -> Result<AuthorFeedPage, CoreError> {
        let session = self.session()?;
        self.api
            .get_author_feed(&session.access_jwt, &session.did, self.page_size, cursor)
            .await
    }

    /// One feed page; an expired session is refreshed once and the page
    /// requested again.
    async fn author_feed_page(
        &mut self,
        cursor: Option<&str>,
    ) -> Result<AuthorFeedPage, CoreError> {
        match self.author_feed_once(cursor).await {
            Err(CoreError::BlueskyApi(BlueskyApiError::ExpiredToken)) => {
                info!("Session expired while fetching posts, refreshing");
                self.refresh().await?;
                debug!("Replaying author feed request at cursor {:?}", cursor);
                self.author_feed_once(cursor).await
            }
            other => other,
        }
    }

    /// Lazily page through the account's author feed, yielding only posts
    /// the account itself wrote.
    pub fn fetch_own_posts(&mut self) -> impl Stream<Item = Result<Post, CoreError>> + '_ {
        let pages = stream::try_unfold(
            (self, Some(None::<String>)),
            |(client, cursor)| async move {
                let Some(cursor) = cursor else {
                    return Ok(None);
                };

                let page = client.author_feed_page(cursor.as_deref()).await?;
                let own_did = client.session()?.did.as_str();

                let next = page.cursor.filter(|c| !c.is_empty());
                let posts: Vec<Result<Post, CoreError>> = page
                    .feed
                    .into_iter()
                    .filter(|item| item.post.author.did == own_did)
                    .map(|item| Ok(Post::from(item.post)))
                    .collect();

                Ok::<_, CoreError>(Some((posts, (client, next.map(Some)))))
            },
        );

        pages
            .map_ok(|posts| stream::iter(posts))
            .try_flatten()
    }

    /// Collect every own post from the current session.
    pub async fn collect_own_posts(&mut self) -> Result<Vec<Post>, CoreError> {
        let posts: Vec<Post> = self.fetch_own_posts().try_collect().await?;
        info!("Fetched {} total posts", posts.len());
        Ok(posts)
    }

    async fn delete_once(&self, uri: &str) -> Result<(), CoreError> {
        let session = self.session()?;
        let rkey = record_key(uri).ok_or_else(|| {
            CoreError::BlueskyApi(BlueskyApiError::MalformedUri {
                uri: uri.to_string(),
            })
        })?;
        self.api
            .delete_record(&session.access_jwt, &session.did, rkey)
            .await
    }
}

#[async_trait]
impl PostDeleter for BlueskyClient {
    async fn delete_post(&mut self, uri: &str) -> Result<(), CoreError> {
        match self.delete_once(uri).await {
            Err(CoreError::BlueskyApi(BlueskyApiError::ExpiredToken)) => {
                info!("Session expired while deleting {}, refreshing", uri);
                self.refresh().await?;
                debug!("Replaying delete of {}", uri);
                self.delete_once(uri).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl AccountClient for BlueskyClient {
    async fn sign_in(&mut self, credentials: &Credentials) -> Result<(), CoreError> {
        self.authenticate(credentials).await.map(|_| ())
    }

    async fn fetch_all_posts(
        &mut self,
        on_fetched: &mut (dyn FnMut(usize) + Send),
    ) -> Result<Vec<Post>, CoreError> {
        let mut stream = Box::pin(self.fetch_own_posts());
        let mut posts = Vec::new();
        while let Some(post) = stream.try_next().await? {
            posts.push(post);
            on_fetched(posts.len());
        }
        info!("Fetched {} total posts", posts.len());
        Ok(posts)
    }
}
