//! Action helpers for the blog app.
//!
//! Each helper performs a fixed sequence of UI operations and returns once
//! the app has acknowledged it. Helpers check nothing beyond that
//! acknowledgement.

use blogprobe::{HarnessResult, Locator, Session};

/// Log in through the login form and wait for the "logged in" banner.
///
/// # Errors
///
/// Returns `ElementNotFound` if the form or the banner never appears.
pub async fn login(session: &mut Session, username: &str, password: &str) -> HarnessResult<()> {
    session.fill(&Locator::test_id("username"), username).await?;
    session.fill(&Locator::test_id("password"), password).await?;
    session.click(&Locator::button("login")).await?;
    session.wait_for(&Locator::text("logged in")).await
}

/// Create a blog post through the "new blog" form and wait for its notification.
///
/// # Errors
///
/// Returns `ElementNotFound` if the form is missing or the notification
/// never mentions the new title.
pub async fn create_blog_post(
    session: &mut Session,
    title: &str,
    author: &str,
    url: &str,
) -> HarnessResult<()> {
    session.click(&Locator::button("new blog")).await?;
    session.fill(&Locator::label("Title"), title).await?;
    session.fill(&Locator::label("Author"), author).await?;
    session.fill(&Locator::label("Url"), url).await?;
    session.click(&Locator::button("create")).await?;
    let notification = Locator::css("#notification").filter_has_text(format!("a new blog {title}"));
    session.wait_for(&notification).await
}

/// Log out and wait for the login form.
///
/// # Errors
///
/// Returns `ElementNotFound` if there is no logout button or the login form
/// never comes back.
pub async fn logout(session: &mut Session) -> HarnessResult<()> {
    session.click(&Locator::button("logout")).await?;
    session.wait_for(&Locator::text("Log in to application")).await
}
