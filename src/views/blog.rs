//! Public blog pages and the author's editor.

use validator::Validate;

use crate::client::Backend;
use crate::flow::submit::SubmitGuard;
use crate::flow::validation_message;
use crate::models::blog::{BlogPost, slugify};
use crate::session::SessionContext;
use crate::structs::blog_request::BlogRequest;
use crate::views::{DeleteConfirmation, ViewError};

#[derive(Debug, Default)]
pub struct BlogListView {
    posts: Vec<BlogPost>,
    error: Option<String>,
}

impl BlogListView {
    pub fn new() -> Self {
        Self::default()
    }

    /// No session needed.
    pub async fn load(&mut self, backend: &dyn Backend) -> Result<(), ViewError> {
        match backend.list_blogs().await {
            Ok(mut posts) => {
                posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                self.posts = posts;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                log::warn!("Loading blog posts failed: {}", e);
                self.error = Some(e.user_message());
                Err(ViewError::Api(e))
            }
        }
    }

    /// Newest first.
    pub fn posts(&self) -> &[BlogPost] {
        &self.posts
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The title is what the author types to confirm.
    pub fn confirm_delete(&self, slug: &str) -> Result<DeleteConfirmation, ViewError> {
        self.posts
            .iter()
            .find(|post| post.slug == slug)
            .map(|post| DeleteConfirmation::new(&post.slug, &post.title))
            .ok_or_else(|| ViewError::NotFound(slug.to_string()))
    }

    pub async fn delete(
        &mut self,
        backend: &dyn Backend,
        session: &SessionContext,
        confirmation: &DeleteConfirmation,
    ) -> Result<(), ViewError> {
        let session = session.require()?;
        if !confirmation.is_enabled() {
            return Err(ViewError::ConfirmationMismatch);
        }

        backend.delete_blog(&session.token, confirmation.id()).await?;
        log::info!("Deleted blog post {}", confirmation.id());
        self.posts.retain(|post| post.slug != confirmation.id());
        Ok(())
    }
}

pub async fn load_post(backend: &dyn Backend, slug: &str) -> Result<BlogPost, ViewError> {
    Ok(backend.get_blog(slug).await?)
}

/// Create or update form. The slug follows the title until the author
/// edits it by hand.
#[derive(Debug, Default)]
pub struct BlogEditor {
    request: BlogRequest,
    original_slug: Option<String>,
    slug_edited: bool,
    guard: SubmitGuard,
    error: Option<String>,
}

impl BlogEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(post: &BlogPost) -> Self {
        Self {
            request: BlogRequest {
                title: post.title.clone(),
                slug: post.slug.clone(),
                content: post.content.clone(),
                excerpt: post.excerpt.clone(),
                cover_image_url: post.cover_image_url.clone(),
                tags: post.tags.clone(),
            },
            original_slug: Some(post.slug.clone()),
            slug_edited: true,
            ..Self::default()
        }
    }

    pub fn is_update(&self) -> bool {
        self.original_slug.is_some()
    }

    pub fn request(&self) -> &BlogRequest {
        &self.request
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.request.title = title.into();
        if !self.slug_edited {
            self.request.slug = slugify(&self.request.title);
        }
    }

    pub fn set_slug(&mut self, slug: &str) {
        self.request.slug = slugify(slug);
        self.slug_edited = true;
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.request.content = content.into();
    }

    pub fn set_excerpt(&mut self, excerpt: Option<String>) {
        self.request.excerpt = excerpt.filter(|e| !e.trim().is_empty());
    }

    pub fn set_cover_image_url(&mut self, url: Option<String>) {
        self.request.cover_image_url = url;
    }

    /// Comma separated; blanks dropped.
    pub fn set_tags(&mut self, tags: &str) {
        self.request.tags = tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect();
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.guard.is_submitting()
    }

    pub async fn submit(
        &mut self,
        backend: &dyn Backend,
        session: &SessionContext,
    ) -> Result<BlogPost, ViewError> {
        let session = session.require()?;
        if let Err(errors) = self.request.validate() {
            let message = validation_message(&errors);
            self.error = Some(message.clone());
            return Err(ViewError::Invalid(message));
        }
        self.guard.try_begin().map_err(|_| ViewError::Busy)?;

        let outcome = match &self.original_slug {
            Some(slug) => backend.update_blog(&session.token, slug, &self.request).await,
            None => backend.create_blog(&session.token, &self.request).await,
        };
        self.guard.settle();

        match outcome {
            Ok(post) => {
                log::info!("Saved blog post {}", post.slug);
                self.original_slug = Some(post.slug.clone());
                self.error = None;
                Ok(post)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(ViewError::Api(e))
            }
        }
    }
}
