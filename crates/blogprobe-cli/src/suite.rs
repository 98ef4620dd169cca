//! The blog app suite.
//!
//! ```text
//! Blog app                         setup: reset, seed mluukkai, goto root
//! ├── Login form is shown
//! └── Login
//!     ├── succeeds with correct credentials
//!     ├── fails with wrong credentials
//!     └── When logged in           setup: + log in
//!         ├── a new blog can be created
//!         └── after new blog is created   setup: + create "title two"
//!             ├── blog can be liked
//!             └── a new blog can be deleted by the user
//! multiple users and blogs exist   setup: reset, seed both users, goto root,
//! │                                       two blogs by mluukkai, one liked
//! │                                       blog by testname
//! ├── only the user who added the blog sees the blog's delete button
//! └── blogs are listed in descending order of likes
//! ```

use crate::helpers::{create_blog_post, login, logout};
use blogprobe::{
    goto_root, reset_state, seed_user, step, Credential, DialogResponse, Group, HarnessError,
    HarnessResult, Locator, Role, ScenarioContext, Session, Suite,
};
use futures::future::BoxFuture;

/// Owner of the blogs created in most scenarios
#[must_use]
pub fn mluukkai() -> Credential {
    Credential::new("Matti Luukkainen", "mluukkai", "salainen")
}

/// Second user for the permission scenarios
#[must_use]
pub fn testname() -> Credential {
    Credential::new("Test Name", "testname", "pw123")
}

/// Build the full suite
#[must_use]
pub fn blog_suite() -> Suite {
    Suite::new("blog")
        .group(
            Group::new("Blog app")
                .setup(reset_state())
                .setup(seed_user(mluukkai()))
                .setup(goto_root())
                .scenario("Login form is shown", login_form_is_shown)
                .group(
                    Group::new("Login")
                        .scenario("succeeds with correct credentials", login_succeeds)
                        .scenario("fails with wrong credentials", login_fails)
                        .group(
                            Group::new("When logged in")
                                .setup(step("log in as mluukkai", log_in_as_owner))
                                .scenario("a new blog can be created", blog_can_be_created)
                                .group(
                                    Group::new("after new blog is created")
                                        .setup(step("create blog \"title two\"", create_title_two))
                                        .scenario("blog can be liked", blog_can_be_liked)
                                        .scenario(
                                            "a new blog can be deleted by the user",
                                            blog_can_be_deleted,
                                        ),
                                ),
                        ),
                ),
        )
        .group(
            Group::new("multiple users and blogs exist")
                .setup(reset_state())
                .setup(seed_user(mluukkai()))
                .setup(seed_user(testname()))
                .setup(goto_root())
                .setup(step("mluukkai creates two blogs", owner_creates_two_blogs))
                .setup(step("testname creates and likes a blog", second_user_likes_own_blog))
                .scenario(
                    "only the user who added the blog sees the blog's delete button",
                    only_creator_sees_delete,
                )
                .scenario("blogs are listed in descending order of likes", blogs_ordered_by_likes),
        )
}

/// Click "view" on every collapsed post, first to last.
async fn expand_all(session: &mut Session) -> HarnessResult<()> {
    let view = Locator::button("view");
    let count = session.count(&view).await?;
    for _ in 0..count {
        session.click(&view.clone().first()).await?;
    }
    Ok(())
}

// ===== SETUP STEPS =====

fn log_in_as_owner(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move { login(&mut ctx.session, "mluukkai", "salainen").await })
}

fn create_title_two(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        create_blog_post(&mut ctx.session, "title two", "John Smith", "https://url.one").await
    })
}

fn owner_creates_two_blogs(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        login(session, "mluukkai", "salainen").await?;
        create_blog_post(session, "Title One", "Author One", "Url One").await?;
        create_blog_post(session, "Title Two", "Author Two", "Url Two").await?;
        expand_all(session).await?;
        logout(session).await
    })
}

fn second_user_likes_own_blog(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        login(session, "testname", "pw123").await?;
        create_blog_post(session, "title ABC", "Tom Blue", "https://tom.one/abc").await?;
        let post = Locator::text("title ABC Tom Blue");
        session
            .click(&post.clone().get_by_role(Role::Button, "view"))
            .await?;
        session
            .click(&post.parent().get_by_role(Role::Button, "like"))
            .await
    })
}

// ===== SCENARIOS =====

fn login_form_is_shown(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &ctx.session;
        session
            .expect(&Locator::text("Log in to application"))
            .to_be_visible()
            .await?;
        session.expect(&Locator::test_id("username")).to_be_visible().await?;
        session.expect(&Locator::test_id("password")).to_be_visible().await
    })
}

fn login_succeeds(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        login(&mut ctx.session, "mluukkai", "salainen").await?;
        ctx.session
            .expect(&Locator::text("Matti Luukkainen logged in"))
            .to_be_visible()
            .await
    })
}

fn login_fails(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        session.fill(&Locator::test_id("username"), "wrong").await?;
        session.fill(&Locator::test_id("password"), "wrong").await?;
        session.click(&Locator::button("login")).await?;
        session
            .expect(&Locator::css(".error"))
            .to_contain_text("wrong username or password")
            .await?;
        session.expect(&Locator::text("logged in")).to_be_hidden().await
    })
}

fn blog_can_be_created(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        create_blog_post(session, "title one", "author one", "https://url.one").await?;
        session
            .expect(&Locator::text("a new blog title one by author one added"))
            .to_be_visible()
            .await?;

        let post = Locator::css(".blog").filter_has_text("title one author one");
        session.expect(&post).to_have_count(1).await?;
        session
            .click(&post.clone().get_by_role(Role::Button, "view"))
            .await?;
        session
            .expect(&post.locator(".detail"))
            .to_contain_text("https://url.one")
            .await
    })
}

fn blog_can_be_liked(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        session.click(&Locator::button("view")).await?;
        let likes = Locator::css(".likes");
        session.expect(&likes).to_contain_text("0").await?;
        session.click(&Locator::button("like")).await?;
        session.expect(&likes).to_contain_text("1").await
    })
}

fn blog_can_be_deleted(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        session.click(&Locator::button("view")).await?;
        let dialog = session
            .click_expecting_dialog(&Locator::button("delete"), DialogResponse::Accept)
            .await?;
        let expected = "Remove blog title two by John Smith";
        if dialog.message() != expected {
            return Err(HarnessError::assertion(format!(
                "confirm said {:?}, expected {expected:?}",
                dialog.message()
            )));
        }
        session
            .expect(&Locator::text("title two John Smith"))
            .to_have_count(0)
            .await
    })
}

fn only_creator_sees_delete(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        expand_all(session).await?;

        // The banner also says "Test Name logged in"; only the post details count.
        let creator = Locator::css(".detail").get_by_text("Test Name");
        session.expect(&creator).to_have_count(1).await?;
        session
            .expect(&creator.parent().get_by_role(Role::Button, "delete"))
            .to_be_visible()
            .await?;

        session.expect(&Locator::button("delete")).to_have_count(1).await?;
        session.expect(&Locator::css(".detail")).to_have_count(3).await
    })
}

fn blogs_ordered_by_likes(ctx: &mut ScenarioContext) -> BoxFuture<'_, HarnessResult<()>> {
    Box::pin(async move {
        let session = &mut ctx.session;
        expand_all(session).await?;

        let like = Locator::button("like");
        for _ in 0..5 {
            session.click(&like.clone().first()).await?;
        }
        session.click(&like.last()).await?;

        let likes = Locator::css(".likes");
        session.expect(&likes).to_have_count_at_least(2).await?;
        session.expect(&likes).to_have_leading_maximum().await?;
        session.expect(&likes).to_be_sorted_descending().await
    })
}
