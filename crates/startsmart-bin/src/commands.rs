//! Subcommand handlers.

use crate::app::{App, AppResult};
use backend_api::{Book, Edition};
use catalog_fetcher::ShelfSelection;
use std::process::ExitCode;

fn outcome<T, E: std::fmt::Display>(result: Result<T, E>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Refuse account commands when nobody is signed in.
fn require_user(app: &App) -> Option<ExitCode> {
    if app.current_session().is_authenticated() {
        return None;
    }
    eprintln!("Not signed in. Run `startsmart login` first.");
    Some(ExitCode::FAILURE)
}

pub async fn grades(app: &App) -> AppResult<ExitCode> {
    let state = app.load_catalog().await;
    for grade in &state.grades {
        println!("{}", grade.grade);
    }
    Ok(if state.error.is_some() && state.grades.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_book_line(book: &Book) {
    match &book.author {
        Some(author) => println!("{}\t{}\t{}", book.title, book.subject, author),
        None => println!("{}\t{}", book.title, book.subject),
    }
}

pub async fn books(app: &App, grade: &str, edition: Edition) -> AppResult<ExitCode> {
    let state = app.load_catalog().await;
    let selection = ShelfSelection::new(grade, edition);
    let shelf = catalog_fetcher::select_books(&state.books, Some(&selection));

    if shelf.is_empty() {
        eprintln!("No books for {} ({})", grade, edition);
    }
    for book in shelf {
        print_book_line(book);
    }
    Ok(if state.error.is_some() && state.books.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

pub async fn book(app: &App, title: &str) -> AppResult<ExitCode> {
    let state = app.load_catalog().await;
    let Some(book) = state.books.iter().find(|b| b.title == title) else {
        eprintln!("No book titled {:?}", title);
        return Ok(ExitCode::FAILURE);
    };

    println!("title:       {}", book.title);
    println!("grade:       {}", book.grade);
    println!("edition:     {}", book.edition);
    println!("subject:     {}", book.subject);
    if let Some(author) = &book.author {
        println!("author:      {}", author);
    }
    if !book.description.is_empty() {
        println!("description: {}", book.description);
    }
    if book.has_image() {
        println!("image:       {}", book.image);
    }
    println!("document:    {}", book.uri);
    println!(
        "orientation: {}",
        if book.is_landscape() { "landscape" } else { "portrait" }
    );
    Ok(ExitCode::SUCCESS)
}

pub async fn login(app: &App, email: &str, password: &str) -> AppResult<ExitCode> {
    Ok(outcome(app.account.login(email, password).await))
}

pub async fn signup(app: &App, name: &str, email: &str, password: &str) -> AppResult<ExitCode> {
    Ok(outcome(app.account.sign_up(name, email, password).await))
}

pub async fn google_login(app: &App, id_token: &str, signup: bool) -> AppResult<ExitCode> {
    Ok(outcome(app.account.google_sign_in(id_token, signup).await))
}

pub async fn reset_password(app: &App, email: &str) -> AppResult<ExitCode> {
    Ok(outcome(app.account.reset_password(email).await))
}

/// Print the navigation decision and the signed-in user.
pub async fn whoami(app: &App) -> AppResult<ExitCode> {
    let session = app.current_session();
    let Some(user) = session.user.filter(|_| session.state.is_authenticated()) else {
        println!("unauthenticated (authentication flow)");
        return Ok(ExitCode::SUCCESS);
    };

    println!("authenticated (main app)");
    println!("uid:     {}", user.uid);
    println!("email:   {}", user.email);
    if let Some(name) = &user.display_name {
        println!("name:    {}", name);
    }
    if let Some(phone) = user.phone.as_ref().or(user.phone_number.as_ref()) {
        println!("phone:   {}", phone);
    }
    match app.auth.token_expires_at() {
        Some(expires_at) => println!("token:   expires {}", expires_at.to_rfc3339()),
        None => println!("token:   none (identity provider not signed in)"),
    }
    println!("storage: {}", app.paths.storage_file().display());
    Ok(ExitCode::SUCCESS)
}

pub async fn profile(app: &App) -> AppResult<ExitCode> {
    if let Some(code) = require_user(app) {
        return Ok(code);
    }
    let user = app.account.refresh_profile().await?;
    if let Some(user) = user {
        println!("email: {}", user.email);
        println!("name:  {}", user.display_name.as_deref().unwrap_or(""));
        println!("phone: {}", user.phone.as_deref().unwrap_or(""));
        if let Some(id) = &user.backend_id {
            println!("id:    {}", id);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn set_name(app: &App, name: &str) -> AppResult<ExitCode> {
    if let Some(code) = require_user(app) {
        return Ok(code);
    }
    Ok(outcome(app.account.update_display_name(name).await))
}

pub async fn set_phone(app: &App, phone: &str) -> AppResult<ExitCode> {
    if let Some(code) = require_user(app) {
        return Ok(code);
    }
    Ok(outcome(app.account.update_phone(phone).await))
}

pub async fn logout(app: &App) -> AppResult<ExitCode> {
    if let Some(code) = require_user(app) {
        return Ok(code);
    }
    Ok(outcome(app.account.sign_out().await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_api::test_util::{MockHttpServer, MockResponse};
    use startsmart_config_and_utils::{Config, Paths, RecordingNotifier};
    use std::sync::Arc;

    async fn app_for(server: &MockHttpServer, dir: &tempfile::TempDir) -> (App, Arc<RecordingNotifier>) {
        let config = Config {
            api_base_url: server.base_url(),
            identity_toolkit_url: format!("{}/v1", server.base_url()),
            firebase_api_key: "test-key".to_string(),
            ..Config::default()
        };
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let app = App::with_notifier(config, paths, notifier.clone()).await.unwrap();
        (app, notifier)
    }

    #[tokio::test]
    async fn test_catalog_commands() {
        let server = MockHttpServer::start().await;
        server.route("GET", "/api/grades", MockResponse::json(200, r#"[{"grade":"Grade 3"}]"#));
        server.route(
            "GET",
            "/api/books",
            MockResponse::json(
                200,
                r#"[{"title":"A","grade":"Grade 3","edition":"annual edition"},
                    {"title":"B","grade":"Grade 3","edition":"term edition"}]"#,
            ),
        );
        let dir = tempfile::tempdir().unwrap();
        let (app, notifier) = app_for(&server, &dir).await;

        assert_eq!(grades(&app).await.unwrap(), ExitCode::SUCCESS);
        assert_eq!(books(&app, "Grade 3", Edition::Annual).await.unwrap(), ExitCode::SUCCESS);
        assert_eq!(book(&app, "B").await.unwrap(), ExitCode::SUCCESS);
        assert_eq!(book(&app, "Missing").await.unwrap(), ExitCode::FAILURE);
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_exits_nonzero() {
        let server = MockHttpServer::start().await;
        server.route("GET", "/api/books", MockResponse::json(500, "{}"));
        server.route("GET", "/api/grades", MockResponse::json(500, "{}"));
        let dir = tempfile::tempdir().unwrap();
        let (app, notifier) = app_for(&server, &dir).await;

        assert_eq!(grades(&app).await.unwrap(), ExitCode::FAILURE);
        assert!(notifier.count() >= 1);
    }

    #[tokio::test]
    async fn test_account_commands_require_session() {
        let server = MockHttpServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(&server, &dir).await;

        assert_eq!(whoami(&app).await.unwrap(), ExitCode::SUCCESS);
        assert_eq!(set_phone(&app, "0123456789").await.unwrap(), ExitCode::FAILURE);
        assert_eq!(logout(&app).await.unwrap(), ExitCode::FAILURE);
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_session_carries_across_runs() {
        let server = MockHttpServer::start().await;
        server.route(
            "POST",
            "/v1/accounts:signInWithPassword",
            MockResponse::json(
                200,
                r#"{"localId":"uid-1","email":"ana@example.com","idToken":"t","refreshToken":"r","expiresIn":"3600"}"#,
            ),
        );
        let dir = tempfile::tempdir().unwrap();

        {
            let (app, notifier) = app_for(&server, &dir).await;
            assert_eq!(
                login(&app, "ana@example.com", "secret1").await.unwrap(),
                ExitCode::SUCCESS
            );
            assert_eq!(notifier.messages(), vec!["Login successful".to_string()]);
        }

        let (app, _) = app_for(&server, &dir).await;
        let session = app.current_session();
        assert!(session.is_authenticated());
        let user = session.user.unwrap();
        assert_eq!(user.uid, "uid-1");
        assert_eq!(user.email, "ana@example.com");
        assert!(app.auth.token_expires_at().is_some());

        assert_eq!(logout(&app).await.unwrap(), ExitCode::SUCCESS);
        drop(app);

        let (app, _) = app_for(&server, &dir).await;
        assert!(!app.current_session().is_authenticated());
    }
}
