//! In-memory blog app: a backend implementing `BackendApi` and a UI
//! implementing `MockApp`, sharing one database.

use async_trait::async_trait;
use blogprobe::{
    BackendApi, Credential, HarnessError, HarnessResult, MockApp, MockNode, PageEvents,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Blog {
    id: u64,
    title: String,
    author: String,
    url: String,
    likes: u32,
    owner: String,
    owner_name: String,
}

#[derive(Debug, Default)]
pub struct BlogDb {
    users: Vec<Credential>,
    blogs: Vec<Blog>,
    next_id: u64,
}

pub type SharedDb = Arc<Mutex<BlogDb>>;

fn lock(db: &SharedDb) -> HarnessResult<MutexGuard<'_, BlogDb>> {
    db.lock().map_err(|_| HarnessError::InvalidState {
        message: "blog database poisoned".to_string(),
    })
}

pub fn new_db() -> SharedDb {
    Arc::new(Mutex::new(BlogDb::default()))
}

// ===== BACKEND =====

#[derive(Debug)]
pub struct SimBackend {
    db: SharedDb,
    down: bool,
    calls: Mutex<Vec<String>>,
}

impl SimBackend {
    pub fn new(db: SharedDb) -> Self {
        Self {
            db,
            down: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose application does not answer
    pub fn down(db: SharedDb) -> Self {
        Self {
            down: true,
            ..Self::new(db)
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: impl Into<String>) -> HarnessResult<()> {
        if self.down {
            return Err(HarnessError::Unreachable {
                url: "http://blog.sim".to_string(),
                message: "connection refused".to_string(),
            });
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BackendApi for SimBackend {
    async fn reset(&self) -> HarnessResult<()> {
        self.record("reset")?;
        let mut db = lock(&self.db)?;
        db.users.clear();
        db.blogs.clear();
        Ok(())
    }

    async fn create_user(&self, credential: &Credential) -> HarnessResult<()> {
        self.record(format!("user:{}", credential.username))?;
        lock(&self.db)?.users.push(credential.clone());
        Ok(())
    }

    async fn probe(&self) -> HarnessResult<()> {
        self.record("probe")
    }
}

// ===== UI =====

/// A deliberate bug in the simulated frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Blogs are listed in creation order
    Unsorted,
    /// The creation notification shows but the post is never stored
    LosesPosts,
    /// Every logged-in viewer gets a delete button
    DeleteForEveryone,
    /// The removal confirm omits the author
    WrongConfirm,
}

#[derive(Debug)]
pub struct BlogUi {
    db: SharedDb,
    fault: Option<Fault>,
    username: String,
    password: String,
    user: Option<Credential>,
    notification: Option<(String, bool)>,
    form_open: bool,
    title: String,
    author: String,
    url: String,
    expanded: BTreeSet<u64>,
}

impl BlogUi {
    pub fn new(db: SharedDb) -> Self {
        Self {
            db,
            fault: None,
            username: String::new(),
            password: String::new(),
            user: None,
            notification: None,
            form_open: false,
            title: String::new(),
            author: String::new(),
            url: String::new(),
            expanded: BTreeSet::new(),
        }
    }

    /// A faulty build
    pub fn with_fault(db: SharedDb, fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::new(db)
        }
    }

    fn has_fault(&self, fault: Fault) -> bool {
        self.fault == Some(fault)
    }

    fn blogs(&self) -> Vec<Blog> {
        let mut blogs = self.db.lock().map(|db| db.blogs.clone()).unwrap_or_default();
        if !self.has_fault(Fault::Unsorted) {
            blogs.sort_by(|a, b| b.likes.cmp(&a.likes));
        }
        blogs
    }

    fn render_login(&self) -> MockNode {
        MockNode::new("div")
            .child(MockNode::new("h2").text("Log in to application"))
            .child(
                MockNode::new("form")
                    .child(
                        MockNode::new("div").text("username").child(
                            MockNode::new("input")
                                .test_id("username")
                                .key("username")
                                .value(&self.username),
                        ),
                    )
                    .child(
                        MockNode::new("div").text("password").child(
                            MockNode::new("input")
                                .input_type("password")
                                .test_id("password")
                                .key("password")
                                .value(&self.password),
                        ),
                    )
                    .child(
                        MockNode::new("button")
                            .input_type("submit")
                            .text("login")
                            .key("login"),
                    ),
            )
    }

    fn render_blog(&self, blog: &Blog, viewer: &str) -> MockNode {
        let open = self.expanded.contains(&blog.id);
        let mut node = MockNode::new("div").class("blog").child(
            MockNode::new("div")
                .text(format!("{} {}", blog.title, blog.author))
                .child(
                    MockNode::new("button")
                        .text(if open { "hide" } else { "view" })
                        .key(format!("view:{}", blog.id)),
                ),
        );
        if open {
            let mut detail = MockNode::new("div")
                .class("detail")
                .child(MockNode::new("a").text(&blog.url))
                .child(
                    MockNode::new("div")
                        .child(MockNode::new("span").class("likes").text(format!("likes {}", blog.likes)))
                        .child(
                            MockNode::new("button")
                                .text("like")
                                .key(format!("like:{}", blog.id)),
                        ),
                )
                .child(MockNode::new("div").text(&blog.owner_name));
            if blog.owner == viewer || self.has_fault(Fault::DeleteForEveryone) {
                detail = detail.child(
                    MockNode::new("button")
                        .text("delete")
                        .key(format!("delete:{}", blog.id)),
                );
            }
            node = node.child(detail);
        }
        node
    }

    fn render_blogs(&self, user: &Credential) -> MockNode {
        let form = MockNode::new("form")
            .child(MockNode::new("h2").text("create new"))
            .child(field("Title", "title", &self.title))
            .child(field("Author", "author", &self.author))
            .child(field("Url", "url", &self.url))
            .child(
                MockNode::new("button")
                    .input_type("submit")
                    .text("create")
                    .key("create"),
            );

        let mut list = MockNode::new("div");
        for blog in self.blogs() {
            list = list.child(self.render_blog(&blog, &user.username));
        }

        MockNode::new("div")
            .child(MockNode::new("h2").text("blogs"))
            .child(
                MockNode::new("p")
                    .text(format!("{} logged in", user.name))
                    .child(MockNode::new("button").text("logout").key("logout")),
            )
            .child(
                MockNode::new("div").hidden(self.form_open).child(
                    MockNode::new("button").text("new blog").key("toggle"),
                ),
            )
            .child(
                MockNode::new("div")
                    .hidden(!self.form_open)
                    .child(form)
                    .child(MockNode::new("button").text("cancel").key("cancel")),
            )
            .child(list)
    }

    fn notify(&mut self, message: impl Into<String>, error: bool) {
        self.notification = Some((message.into(), error));
    }

    fn submit_login(&mut self) -> HarnessResult<()> {
        let found = lock(&self.db)?
            .users
            .iter()
            .find(|u| u.username == self.username && u.password == self.password)
            .cloned();
        match found {
            Some(user) => {
                self.user = Some(user);
                self.notification = None;
            }
            None => self.notify("wrong username or password", true),
        }
        self.username.clear();
        self.password.clear();
        Ok(())
    }

    fn submit_blog(&mut self) -> HarnessResult<()> {
        let Some(user) = self.user.clone() else {
            return Ok(());
        };
        if !self.has_fault(Fault::LosesPosts) {
            let mut db = lock(&self.db)?;
            db.next_id += 1;
            let id = db.next_id;
            db.blogs.push(Blog {
                id,
                title: self.title.clone(),
                author: self.author.clone(),
                url: self.url.clone(),
                likes: 0,
                owner: user.username.clone(),
                owner_name: user.name.clone(),
            });
        }
        let message = format!("a new blog {} by {} added", self.title, self.author);
        self.notify(message, false);
        self.title.clear();
        self.author.clear();
        self.url.clear();
        self.form_open = false;
        Ok(())
    }

    fn like(&self, id: u64) -> HarnessResult<()> {
        let mut db = lock(&self.db)?;
        if let Some(blog) = db.blogs.iter_mut().find(|b| b.id == id) {
            blog.likes += 1;
        }
        Ok(())
    }

    fn delete(&mut self, id: u64, page: &mut PageEvents<'_>) -> HarnessResult<()> {
        let Some(blog) = lock(&self.db)?.blogs.iter().find(|b| b.id == id).cloned() else {
            return Ok(());
        };
        let message = if self.has_fault(Fault::WrongConfirm) {
            format!("Remove blog {}", blog.title)
        } else {
            format!("Remove blog {} by {}", blog.title, blog.author)
        };
        if page.confirm(message) {
            lock(&self.db)?.blogs.retain(|b| b.id != id);
            self.expanded.remove(&id);
        }
        Ok(())
    }
}

fn field(label: &str, key: &str, value: &str) -> MockNode {
    MockNode::new("div").child(
        MockNode::new("label")
            .text(label)
            .child(MockNode::new("input").key(key).value(value)),
    )
}

fn parse_id(key: &str, prefix: &str) -> Option<u64> {
    key.strip_prefix(prefix)?.parse().ok()
}

impl MockApp for BlogUi {
    fn render(&self) -> MockNode {
        let mut root = MockNode::new("div").id("root");
        if let Some((message, error)) = &self.notification {
            root = root.child(
                MockNode::new("div")
                    .id("notification")
                    .class(if *error { "error" } else { "success" })
                    .text(message),
            );
        }
        match &self.user {
            Some(user) => root.child(self.render_blogs(user)),
            None => root.child(self.render_login()),
        }
    }

    fn navigate(&mut self, _url: &str) -> HarnessResult<()> {
        let db = Arc::clone(&self.db);
        let fault = self.fault;
        *self = Self::new(db);
        self.fault = fault;
        Ok(())
    }

    fn click(&mut self, key: &str, page: &mut PageEvents<'_>) -> HarnessResult<()> {
        match key {
            "login" => self.submit_login(),
            "logout" => {
                self.user = None;
                self.expanded.clear();
                self.form_open = false;
                self.notification = None;
                Ok(())
            }
            "toggle" => {
                self.form_open = true;
                Ok(())
            }
            "cancel" => {
                self.form_open = false;
                Ok(())
            }
            "create" => self.submit_blog(),
            _ => {
                if let Some(id) = parse_id(key, "view:") {
                    if !self.expanded.insert(id) {
                        self.expanded.remove(&id);
                    }
                    Ok(())
                } else if let Some(id) = parse_id(key, "like:") {
                    self.like(id)
                } else if let Some(id) = parse_id(key, "delete:") {
                    self.delete(id, page)
                } else {
                    Err(HarnessError::InvalidState {
                        message: format!("unknown control {key}"),
                    })
                }
            }
        }
    }

    fn fill(&mut self, key: &str, value: &str) -> HarnessResult<()> {
        let slot = match key {
            "username" => &mut self.username,
            "password" => &mut self.password,
            "title" => &mut self.title,
            "author" => &mut self.author,
            "url" => &mut self.url,
            _ => {
                return Err(HarnessError::InvalidState {
                    message: format!("no input {key}"),
                })
            }
        };
        *slot = value.to_string();
        Ok(())
    }
}
