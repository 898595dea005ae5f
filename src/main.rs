use iced::{Element, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;

use codress::api::ApiClient;
use codress::config::Config;
use codress::error::SyncError;
use codress::gallery;
use codress::preview::{self, PreviewPixels};
use codress::state::data::{ImageRecord, SearchResult, StyleFilter};
use codress::state::handoff::{self, HandoffLedger, MountPlan, NavigationHandoff};
use codress::state::registry::{Generation, ImageRegistry};
use codress::state::search::SearchCoordinator;
use codress::state::session::{self, Session, SessionStore, UserProfile};
use codress::state::upload::{
    self, LocalFile, PreviewId, PreviewRequest, UploadCoordinator, ACCEPTED_EXTENSIONS,
};

mod ui;

use ui::image_cache::{ImageCache, PreviewCache};

/// Screens of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Upload,
    Wardrobe,
}

impl Route {
    fn requires_session(self) -> bool {
        matches!(self, Route::Upload | Route::Wardrobe)
    }
}

/// Which upload flow a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// Full-page upload that hands its result to the wardrobe screen
    Page,
    /// Modal on the wardrobe screen instance with this mount id
    Modal(u64),
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    Navigate(Route),
    Logout,

    LoginUsernameChanged(String),
    LoginPasswordChanged(String),
    LoginSubmit,
    LoginFinished(Result<UserProfile, SyncError>),

    RegisterUsernameChanged(String),
    RegisterPasswordChanged(String),
    RegisterConfirmChanged(String),
    RegisterSubmit,
    RegisterFinished(Result<String, SyncError>),

    /// Listing finished for (mount id, generation)
    ImagesLoaded(u64, Generation, Result<Vec<ImageRecord>, SyncError>),
    RefreshImages,
    StyleSelected(StyleFilter),
    QueryChanged(String),
    SearchPressed,
    SearchFinished(u64, u64, Result<Vec<SearchResult>, SyncError>),
    ImageFetched(u64, String, Result<Vec<u8>, SyncError>),

    OpenUploadModal,
    CloseUploadModal,
    PickFiles(UploadTarget),
    PickFolder(UploadTarget),
    PreviewRendered(UploadTarget, PreviewId, Result<PreviewPixels, SyncError>),
    SubmitUpload(UploadTarget),
    UploadFinished(UploadTarget, Generation, Result<Vec<ImageRecord>, SyncError>),
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub error: Option<String>,
    pub pending: bool,
}

#[derive(Debug, Default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirmation: String,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub pending: bool,
}

/// Full-page upload; its registry only collects the canonical list that is
/// handed to the wardrobe screen
#[derive(Debug, Default)]
pub struct UploadPage {
    pub upload: UploadCoordinator,
    pub registry: ImageRegistry,
    pub thumbnails: PreviewCache,
}

/// State owned by one mounted wardrobe screen; dropped on unmount
#[derive(Debug)]
pub struct WardrobeScreen {
    pub mount_id: u64,
    pub registry: ImageRegistry,
    pub search: SearchCoordinator,
    pub upload: UploadCoordinator,
    pub modal_open: bool,
    pub style: StyleFilter,
    pub query: String,
    pub images: ImageCache,
    pub thumbnails: PreviewCache,
}

impl WardrobeScreen {
    fn new(mount_id: u64) -> Self {
        Self {
            mount_id,
            registry: ImageRegistry::new(),
            search: SearchCoordinator::new(),
            upload: UploadCoordinator::new(),
            modal_open: false,
            style: StyleFilter::default(),
            query: String::new(),
            images: ImageCache::new(),
            thumbnails: PreviewCache::new(),
        }
    }
}

/// Main application state
struct Codress {
    config: Config,
    api: ApiClient,
    /// `None` when neither the session file nor an in-memory store opened
    session_store: Option<SessionStore>,
    session: Session,
    route: Route,
    /// Where a successful login continues to
    after_login: Route,
    ledger: HandoffLedger,
    pending_handoff: Option<NavigationHandoff>,
    login: LoginForm,
    register: RegisterForm,
    upload_page: UploadPage,
    wardrobe: Option<WardrobeScreen>,
    mounts: u64,
}

impl Codress {
    /// Create a new instance of the application
    fn new(config: Config, api: ApiClient, session_store: Option<SessionStore>) -> (Self, Task<Message>) {
        let session = match session_store.as_ref().map(SessionStore::load) {
            Some(Ok(session)) => session,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "could not read stored session");
                Session::default()
            }
            None => Session::default(),
        };

        let mut app = Codress {
            config,
            api,
            session_store,
            session,
            route: Route::Login,
            after_login: Route::Wardrobe,
            ledger: HandoffLedger::new(),
            pending_handoff: None,
            login: LoginForm::default(),
            register: RegisterForm::default(),
            upload_page: UploadPage::default(),
            wardrobe: None,
            mounts: 0,
        };
        tracing::info!(
            origin = %app.config.backend_origin,
            logged_in = app.session.is_logged_in(),
            "codress initialized"
        );
        let task = app.navigate(Route::Wardrobe);
        (app, task)
    }

    /// Switch screens, enforcing the session gate and the wardrobe lifecycle
    fn navigate(&mut self, target: Route) -> Task<Message> {
        let target = if target.requires_session() && !self.session.is_logged_in() {
            self.after_login = target;
            Route::Login
        } else {
            target
        };

        if self.route == Route::Wardrobe && target != Route::Wardrobe {
            self.unmount_wardrobe();
        }
        if self.route == Route::Upload && target != Route::Upload {
            self.upload_page.upload.cancel();
        }
        let entering_wardrobe = target == Route::Wardrobe && self.wardrobe.is_none();
        self.route = target;
        tracing::debug!(route = ?target, "navigated");

        if entering_wardrobe {
            self.mount_wardrobe()
        } else {
            Task::none()
        }
    }

    fn mount_wardrobe(&mut self) -> Task<Message> {
        self.mounts += 1;
        let mut screen = WardrobeScreen::new(self.mounts);
        let plan = handoff::enter_screen(
            self.pending_handoff.take(),
            &mut self.ledger,
            &mut screen.registry,
        );
        tracing::info!(mount = screen.mount_id, ?plan, "wardrobe mounted");
        self.wardrobe = Some(screen);

        match plan {
            MountPlan::Load(generation) => self.load_images(generation),
            MountPlan::Seeded { .. } => self.fetch_gallery_images(),
            MountPlan::AlreadyLoading => Task::none(),
        }
    }

    fn unmount_wardrobe(&mut self) {
        if let Some(mut screen) = self.wardrobe.take() {
            let revoked = screen.upload.revoke_previews();
            tracing::info!(
                mount = screen.mount_id,
                revoked,
                textures = screen.thumbnails.len(),
                "wardrobe unmounted"
            );
        }
    }

    fn load_images(&self, generation: Generation) -> Task<Message> {
        let Some(mount) = self.wardrobe.as_ref().map(|screen| screen.mount_id) else {
            return Task::none();
        };
        let api = self.api.clone();
        Task::perform(async move { api.list_images().await }, move |outcome| {
            Message::ImagesLoaded(mount, generation, outcome)
        })
    }

    /// Fetch bytes for every card URL the cache has not seen yet
    fn fetch_gallery_images(&mut self) -> Task<Message> {
        let Some(screen) = self.wardrobe.as_mut() else {
            return Task::none();
        };
        let view = gallery::project(
            screen.registry.state(),
            screen.search.state(),
            self.api.origin(),
        );
        let urls: Vec<&str> = view
            .images
            .iter()
            .map(|card| &card.content)
            .chain(view.matches.iter().map(|card| &card.content))
            .filter_map(|content| content.url())
            .collect();
        let to_fetch = screen.images.request(urls);
        let mount = screen.mount_id;
        tracing::debug!(
            mount,
            cached = screen.images.len(),
            fetching = to_fetch.len(),
            "gallery images requested"
        );

        Task::batch(to_fetch.into_iter().map(|url| {
            let api = self.api.clone();
            let key = url.clone();
            Task::perform(async move { api.fetch_image_bytes(&url).await }, move |outcome| {
                Message::ImageFetched(mount, key.clone(), outcome)
            })
        }))
    }

    fn coordinator(&mut self, target: UploadTarget) -> Option<&mut UploadCoordinator> {
        match target {
            UploadTarget::Page => Some(&mut self.upload_page.upload),
            UploadTarget::Modal(mount) => self
                .wardrobe
                .as_mut()
                .filter(|screen| screen.mount_id == mount)
                .map(|screen| &mut screen.upload),
        }
    }

    fn select_files(&mut self, target: UploadTarget, files: Vec<LocalFile>) -> Task<Message> {
        let Some(upload) = self.coordinator(target) else {
            return Task::none();
        };
        let requests = upload.select_files(files);
        render_previews(target, requests)
    }

    fn submit_upload(&mut self, target: UploadTarget) -> Task<Message> {
        let ticket = match target {
            UploadTarget::Page => {
                let page = &mut self.upload_page;
                page.upload.submit(&mut page.registry)
            }
            UploadTarget::Modal(mount) => match self.wardrobe.as_mut() {
                Some(screen) if screen.mount_id == mount => {
                    screen.upload.submit(&mut screen.registry)
                }
                _ => return Task::none(),
            },
        };
        match ticket {
            Ok(ticket) => {
                let api = self.api.clone();
                let generation = ticket.generation;
                Task::perform(
                    async move { api.upload_images(&ticket.files).await },
                    move |outcome| Message::UploadFinished(target, generation, outcome),
                )
            }
            Err(err) => {
                tracing::debug!(error = %err, "upload not started");
                Task::none()
            }
        }
    }

    fn finish_upload(
        &mut self,
        target: UploadTarget,
        generation: Generation,
        outcome: Result<Vec<ImageRecord>, SyncError>,
    ) -> Task<Message> {
        match target {
            UploadTarget::Page => {
                let page = &mut self.upload_page;
                if page.upload.complete(generation, outcome, &mut page.registry).is_err() {
                    return Task::none();
                }
                let images = page.registry.images().to_vec();
                if self.route == Route::Upload {
                    // Hand the canonical list over instead of refetching it
                    self.pending_handoff = Some(NavigationHandoff::new(images));
                    return self.navigate(Route::Wardrobe);
                }
                match self.wardrobe.as_mut() {
                    Some(screen) => {
                        let generation = screen.registry.next_generation();
                        screen.registry.replace_from(generation, images);
                        self.fetch_gallery_images()
                    }
                    None => {
                        tracing::debug!("page upload finished off screen, list not kept");
                        Task::none()
                    }
                }
            }
            UploadTarget::Modal(mount) => {
                let Some(screen) = self
                    .wardrobe
                    .as_mut()
                    .filter(|screen| screen.mount_id == mount)
                else {
                    tracing::debug!(mount, "upload finished after its screen was unmounted");
                    return Task::none();
                };
                let Ok(done) = screen
                    .upload
                    .complete(generation, outcome, &mut screen.registry)
                else {
                    return Task::none();
                };
                screen.modal_open = false;
                if !done.applied.is_applied() {
                    tracing::warn!(
                        generation = generation.value(),
                        "upload list was outranked, reloading from server"
                    );
                    if let Some(reload) = screen.registry.begin_load() {
                        return Task::batch([self.load_images(reload), self.fetch_gallery_images()]);
                    }
                }
                self.fetch_gallery_images()
            }
        }
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);

        // Keep preview textures in step with whatever the coordinators revoked
        self.upload_page.thumbnails.sync(&self.upload_page.upload);
        if let Some(screen) = self.wardrobe.as_mut() {
            screen.thumbnails.sync(&screen.upload);
        }
        task
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Navigate(route) => self.navigate(route),
            Message::Logout => {
                if let Some(store) = &self.session_store {
                    if let Err(err) = store.clear() {
                        tracing::warn!(error = %err, "could not clear stored session");
                    }
                }
                self.session = Session::default();
                self.pending_handoff = None;
                self.after_login = Route::Wardrobe;
                self.navigate(Route::Login)
            }

            Message::LoginUsernameChanged(value) => {
                self.login.username = value;
                Task::none()
            }
            Message::LoginPasswordChanged(value) => {
                self.login.password = value;
                Task::none()
            }
            Message::LoginSubmit => {
                if self.login.pending {
                    return Task::none();
                }
                match session::validate_login(&self.login.username, &self.login.password) {
                    Ok(credentials) => {
                        self.login.error = None;
                        self.login.pending = true;
                        let api = self.api.clone();
                        Task::perform(
                            async move { api.login(&credentials).await },
                            Message::LoginFinished,
                        )
                    }
                    Err(err) => {
                        self.login.error = Some(err.user_message());
                        Task::none()
                    }
                }
            }
            Message::LoginFinished(outcome) => {
                self.login.pending = false;
                match outcome {
                    Ok(user) => {
                        tracing::info!(username = %user.username, "login successful");
                        if let Some(store) = &self.session_store {
                            if let Err(err) = store.save(&user) {
                                tracing::warn!(error = %err, "could not persist session");
                            }
                        }
                        self.session = Session { user: Some(user) };
                        self.login = LoginForm::default();
                        let target = self.after_login;
                        self.navigate(target)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "login failed");
                        self.login.error = Some(match err {
                            SyncError::Server { message, .. } if !message.is_empty() => message,
                            SyncError::Server { .. } => {
                                "Login failed. Please check your details.".to_string()
                            }
                            other => other.user_message(),
                        });
                        Task::none()
                    }
                }
            }

            Message::RegisterUsernameChanged(value) => {
                self.register.username = value;
                Task::none()
            }
            Message::RegisterPasswordChanged(value) => {
                self.register.password = value;
                Task::none()
            }
            Message::RegisterConfirmChanged(value) => {
                self.register.confirmation = value;
                Task::none()
            }
            Message::RegisterSubmit => {
                if self.register.pending {
                    return Task::none();
                }
                let validated = session::validate_registration(
                    &self.register.username,
                    &self.register.password,
                    &self.register.confirmation,
                );
                match validated {
                    Ok(credentials) => {
                        self.register.error = None;
                        self.register.notice = None;
                        self.register.pending = true;
                        let api = self.api.clone();
                        Task::perform(
                            async move { api.register(&credentials).await },
                            Message::RegisterFinished,
                        )
                    }
                    Err(err) => {
                        self.register.error = Some(err.user_message());
                        Task::none()
                    }
                }
            }
            Message::RegisterFinished(outcome) => {
                self.register.pending = false;
                match outcome {
                    Ok(message) => {
                        tracing::info!(username = %self.register.username, "registration successful");
                        self.login.username = self.register.username.clone();
                        self.register = RegisterForm {
                            notice: Some(message),
                            ..RegisterForm::default()
                        };
                        Task::none()
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "registration failed");
                        self.register.error = Some(match err {
                            SyncError::Server { message, .. } if !message.is_empty() => message,
                            other => other.user_message(),
                        });
                        Task::none()
                    }
                }
            }

            Message::ImagesLoaded(mount, generation, outcome) => {
                let Some(screen) = self
                    .wardrobe
                    .as_mut()
                    .filter(|screen| screen.mount_id == mount)
                else {
                    tracing::debug!(mount, "listing finished after its screen was unmounted");
                    return Task::none();
                };
                if screen.registry.complete_load(generation, outcome).is_applied() {
                    return self.fetch_gallery_images();
                }
                Task::none()
            }
            Message::RefreshImages => {
                let generation = self
                    .wardrobe
                    .as_mut()
                    .and_then(|screen| screen.registry.begin_load());
                match generation {
                    Some(generation) => self.load_images(generation),
                    None => Task::none(),
                }
            }
            Message::StyleSelected(style) => {
                if let Some(screen) = self.wardrobe.as_mut() {
                    screen.style = style;
                }
                Task::none()
            }
            Message::QueryChanged(query) => {
                if let Some(screen) = self.wardrobe.as_mut() {
                    screen.query = query;
                }
                Task::none()
            }
            Message::SearchPressed => {
                let Some(screen) = self.wardrobe.as_mut() else {
                    return Task::none();
                };
                let Ok(ticket) = screen.search.search(screen.style, &screen.query) else {
                    return Task::none();
                };
                let api = self.api.clone();
                let mount = screen.mount_id;
                let sequence = ticket.sequence;
                Task::perform(
                    async move { api.search(&ticket.query).await },
                    move |outcome| Message::SearchFinished(mount, sequence, outcome),
                )
            }
            Message::SearchFinished(mount, sequence, outcome) => {
                let Some(screen) = self
                    .wardrobe
                    .as_mut()
                    .filter(|screen| screen.mount_id == mount)
                else {
                    return Task::none();
                };
                if screen.search.complete(sequence, outcome) {
                    return self.fetch_gallery_images();
                }
                Task::none()
            }
            Message::ImageFetched(mount, url, outcome) => {
                if let Some(screen) = self
                    .wardrobe
                    .as_mut()
                    .filter(|screen| screen.mount_id == mount)
                {
                    screen.images.resolve(url, outcome);
                }
                Task::none()
            }

            Message::OpenUploadModal => {
                if let Some(screen) = self.wardrobe.as_mut() {
                    screen.modal_open = true;
                }
                Task::none()
            }
            Message::CloseUploadModal => {
                if let Some(screen) = self.wardrobe.as_mut() {
                    if screen.upload.cancel() {
                        screen.modal_open = false;
                    }
                }
                Task::none()
            }
            Message::PickFiles(target) => {
                // Show the native file picker dialog
                let picked = FileDialog::new()
                    .set_title("Select clothing photos")
                    .add_filter("Images", &ACCEPTED_EXTENSIONS[..])
                    .pick_files();
                let files: Vec<LocalFile> = picked
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(LocalFile::from_path)
                    .filter(LocalFile::has_accepted_extension)
                    .collect();
                self.select_files(target, files)
            }
            Message::PickFolder(target) => {
                let folder: Option<PathBuf> = FileDialog::new()
                    .set_title("Select a folder of clothing photos")
                    .pick_folder();
                match folder {
                    Some(folder) => {
                        let files = upload::collect_folder(&folder);
                        self.select_files(target, files)
                    }
                    None => Task::none(),
                }
            }
            Message::PreviewRendered(target, id, outcome) => {
                match (self.coordinator(target), outcome) {
                    (Some(upload), Ok(pixels)) => {
                        upload.attach_preview(id, pixels);
                    }
                    (_, Err(err)) => {
                        tracing::warn!(error = %err, "preview could not be rendered");
                    }
                    (None, Ok(_)) => {}
                }
                Task::none()
            }
            Message::SubmitUpload(target) => self.submit_upload(target),
            Message::UploadFinished(target, generation, outcome) => {
                self.finish_upload(target, generation, outcome)
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let body = match self.route {
            Route::Login => ui::screens::login(&self.login),
            Route::Register => ui::screens::register(&self.register),
            Route::Upload => ui::screens::upload_page(&self.upload_page),
            Route::Wardrobe => match &self.wardrobe {
                Some(screen) => ui::screens::wardrobe(screen, self.api.origin()),
                None => ui::screens::loading(),
            },
        };
        ui::screens::frame(self.route, self.session.username(), body)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn render_previews(target: UploadTarget, requests: Vec<PreviewRequest>) -> Task<Message> {
    Task::batch(requests.into_iter().map(|request| {
        let id = request.id;
        Task::perform(preview::render_preview(request.path), move |outcome| {
            Message::PreviewRendered(target, id, outcome)
        })
    }))
}

fn open_session_store(config: &Config) -> Option<SessionStore> {
    if let Some(path) = config.session_db_path() {
        match SessionStore::open(&path) {
            Ok(store) => return Some(store),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "session database unavailable");
            }
        }
    }
    match SessionStore::open_in_memory() {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::error!(error = %err, "no session storage, logins will not persist");
            None
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(err) => (Config::defaults()?, Some(err)),
    };
    codress::telemetry::init(&config.log_filter);
    if let Some(err) = config_error {
        tracing::warn!(error = %err, "falling back to default configuration");
    }

    let api = ApiClient::new(&config)?;
    let session_store = open_session_store(&config);

    iced::application("CoDress", Codress::update, Codress::view)
        .theme(Codress::theme)
        .centered()
        .run_with(move || Codress::new(config, api, session_store))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codress::state::registry::RegistryStatus;
    use codress::state::search::SearchStatus;
    use pretty_assertions::assert_eq;

    fn user() -> UserProfile {
        UserProfile {
            username: "ayse".to_string(),
            profile: serde_json::Value::Null,
        }
    }

    fn app(logged_in: bool) -> Codress {
        let config = Config::defaults().unwrap();
        let api = ApiClient::new(&config).unwrap();
        let store = SessionStore::open_in_memory().unwrap();
        if logged_in {
            store.save(&user()).unwrap();
        }
        let (app, _) = Codress::new(config, api, Some(store));
        app
    }

    fn images(names: &[&str]) -> Vec<ImageRecord> {
        names
            .iter()
            .map(|name| ImageRecord::new(*name, format!("/data/{name}")))
            .collect()
    }

    fn files(names: &[&str]) -> Vec<LocalFile> {
        names
            .iter()
            .filter_map(|name| LocalFile::from_path(format!("/photos/{name}")))
            .collect()
    }

    fn wardrobe(app: &Codress) -> &WardrobeScreen {
        app.wardrobe.as_ref().unwrap()
    }

    fn start_page_upload(app: &mut Codress, names: &[&str]) -> Generation {
        let _ = app.update(Message::Navigate(Route::Upload));
        let _ = app.select_files(UploadTarget::Page, files(names));
        let _ = app.update(Message::SubmitUpload(UploadTarget::Page));
        app.upload_page.upload.in_flight().unwrap()
    }

    #[test]
    fn logged_out_user_is_sent_to_login_and_returned_after() {
        let mut app = app(false);
        assert_eq!(app.route, Route::Login);
        assert!(app.wardrobe.is_none());

        let _ = app.update(Message::Navigate(Route::Upload));
        assert_eq!(app.route, Route::Login);
        assert_eq!(app.after_login, Route::Upload);

        let _ = app.update(Message::LoginFinished(Ok(user())));
        assert_eq!(app.route, Route::Upload);
        assert_eq!(app.session.username(), Some("ayse"));
        let stored = app.session_store.as_ref().unwrap().load().unwrap();
        assert!(stored.is_logged_in());
    }

    #[test]
    fn stored_session_opens_wardrobe_with_a_listing() {
        let app = app(true);
        assert_eq!(app.route, Route::Wardrobe);
        assert_eq!(wardrobe(&app).registry.status(), RegistryStatus::Loading);
        assert!(wardrobe(&app).registry.pending_load().is_some());
    }

    #[test]
    fn listing_for_an_earlier_mount_is_ignored() {
        let mut app = app(true);
        let first_mount = wardrobe(&app).mount_id;
        let first_load = wardrobe(&app).registry.pending_load().unwrap();

        let _ = app.update(Message::Navigate(Route::Upload));
        let _ = app.update(Message::Navigate(Route::Wardrobe));
        let second_mount = wardrobe(&app).mount_id;
        let second_load = wardrobe(&app).registry.pending_load().unwrap();
        assert_ne!(first_mount, second_mount);

        let _ = app.update(Message::ImagesLoaded(
            first_mount,
            first_load,
            Ok(images(&["stale.jpg"])),
        ));
        assert_eq!(wardrobe(&app).registry.status(), RegistryStatus::Loading);
        assert!(wardrobe(&app).registry.images().is_empty());

        let _ = app.update(Message::ImagesLoaded(
            second_mount,
            second_load,
            Ok(images(&["fresh.jpg"])),
        ));
        assert_eq!(wardrobe(&app).registry.status(), RegistryStatus::Ready);
        assert_eq!(wardrobe(&app).registry.images(), images(&["fresh.jpg"]).as_slice());
    }

    #[test]
    fn search_response_for_an_earlier_mount_is_ignored() {
        let mut app = app(true);
        let first_mount = wardrobe(&app).mount_id;
        let _ = app.update(Message::QueryChanged("red dress".to_string()));
        let _ = app.update(Message::SearchPressed);
        assert!(wardrobe(&app).search.is_searching());

        let _ = app.update(Message::Navigate(Route::Upload));
        let _ = app.update(Message::Navigate(Route::Wardrobe));
        let results = vec![SearchResult {
            url: Some("/data/a.jpg".to_string()),
            score: Some(0.9),
            matched_query: None,
        }];
        let _ = app.update(Message::SearchFinished(first_mount, 1, Ok(results)));

        assert_eq!(wardrobe(&app).search.status(), SearchStatus::Idle);
        assert!(wardrobe(&app).search.results().is_empty());
    }

    #[test]
    fn page_upload_seeds_wardrobe_without_listing() {
        let mut app = app(true);
        let generation = start_page_upload(&mut app, &["a.jpg"]);
        let canonical = images(&["old.jpg", "a.jpg"]);

        let _ = app.update(Message::UploadFinished(
            UploadTarget::Page,
            generation,
            Ok(canonical.clone()),
        ));
        assert_eq!(app.route, Route::Wardrobe);
        assert!(app.pending_handoff.is_none());
        assert_eq!(wardrobe(&app).registry.status(), RegistryStatus::Ready);
        assert_eq!(wardrobe(&app).registry.images(), canonical.as_slice());
        assert!(!wardrobe(&app).registry.is_loading());
    }

    #[test]
    fn page_upload_finishing_elsewhere_never_seeds_a_later_mount() {
        let mut app = app(true);
        let generation = start_page_upload(&mut app, &["a.jpg"]);
        let _ = app.update(Message::Navigate(Route::Wardrobe));
        assert!(wardrobe(&app).registry.is_loading());

        let canonical = images(&["old.jpg", "a.jpg"]);
        let _ = app.update(Message::UploadFinished(
            UploadTarget::Page,
            generation,
            Ok(canonical.clone()),
        ));
        assert!(app.pending_handoff.is_none());
        assert_eq!(wardrobe(&app).registry.images(), canonical.as_slice());
        assert_eq!(wardrobe(&app).registry.status(), RegistryStatus::Ready);

        let _ = app.update(Message::Navigate(Route::Login));
        let _ = app.update(Message::Navigate(Route::Wardrobe));
        assert_eq!(wardrobe(&app).registry.status(), RegistryStatus::Loading);
        assert!(wardrobe(&app).registry.pending_load().is_some());
    }

    #[test]
    fn page_upload_finishing_after_logout_is_dropped() {
        let mut app = app(true);
        let generation = start_page_upload(&mut app, &["a.jpg"]);
        let _ = app.update(Message::Logout);

        let _ = app.update(Message::UploadFinished(
            UploadTarget::Page,
            generation,
            Ok(images(&["a.jpg"])),
        ));
        assert_eq!(app.route, Route::Login);
        assert!(app.pending_handoff.is_none());

        let _ = app.update(Message::LoginFinished(Ok(user())));
        assert_eq!(wardrobe(&app).registry.status(), RegistryStatus::Loading);
    }

    #[test]
    fn logout_discards_pending_handoff() {
        let mut app = app(true);
        app.pending_handoff = Some(NavigationHandoff::new(images(&["a.jpg"])));

        let _ = app.update(Message::Logout);
        assert!(app.pending_handoff.is_none());
        assert_eq!(app.route, Route::Login);
        assert!(!app.session.is_logged_in());
        assert!(app.wardrobe.is_none());
    }

    #[test]
    fn refresh_is_refused_while_modal_upload_runs() {
        let mut app = app(true);
        let mount = wardrobe(&app).mount_id;
        let load = wardrobe(&app).registry.pending_load().unwrap();
        let _ = app.update(Message::ImagesLoaded(mount, load, Ok(images(&["old.jpg"]))));

        let target = UploadTarget::Modal(mount);
        let _ = app.update(Message::OpenUploadModal);
        let _ = app.select_files(target, files(&["new.jpg"]));
        let _ = app.update(Message::SubmitUpload(target));
        let generation = wardrobe(&app).upload.in_flight().unwrap();

        let _ = app.update(Message::RefreshImages);
        assert!(!wardrobe(&app).registry.is_loading());

        let canonical = images(&["old.jpg", "new.jpg"]);
        let _ = app.update(Message::UploadFinished(target, generation, Ok(canonical.clone())));
        assert_eq!(wardrobe(&app).registry.images(), canonical.as_slice());
        assert!(!wardrobe(&app).modal_open);
        assert_eq!(wardrobe(&app).upload.live_previews(), 0);
    }
}
