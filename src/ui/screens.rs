//! Screen views
//!
//! Pure functions from application state to widgets. Gallery content always
//! goes through `gallery::project` so the cards match what the engine holds.

use iced::widget::{
    button, center, column, container, image, mouse_area, opaque, row, scrollable, stack, text,
    text_input, Column,
};
use iced::{Alignment, Color, Element, Length};
use iced_aw::Wrap;
use url::Url;

use codress::gallery::{self, CardContent};
use codress::state::data::StyleFilter;
use codress::state::upload::UploadCoordinator;

use super::image_cache::{CachedImage, ImageCache, PreviewCache};
use crate::{LoginForm, Message, RegisterForm, Route, UploadPage, UploadTarget, WardrobeScreen};

const CARD_SIZE: f32 = 160.0;
const FORM_WIDTH: f32 = 360.0;

/// Navigation bar around every screen
pub fn frame<'a>(
    route: Route,
    username: Option<&'a str>,
    body: Element<'a, Message>,
) -> Element<'a, Message> {
    let nav_button = |label: &'a str, target: Route| {
        let style = if route == target {
            button::primary
        } else {
            button::secondary
        };
        button(text(label))
            .on_press(Message::Navigate(target))
            .style(style)
            .padding([6, 12])
    };

    let links = match username {
        Some(name) => row![
            nav_button("Wardrobe", Route::Wardrobe),
            nav_button("Upload", Route::Upload),
            text(format!("Signed in as {name}")).size(14),
            button(text("Log out"))
                .on_press(Message::Logout)
                .style(button::danger)
                .padding([6, 12]),
        ],
        None => row![
            nav_button("Log in", Route::Login),
            nav_button("Register", Route::Register),
        ],
    }
    .spacing(10)
    .align_y(Alignment::Center);

    let bar = row![text("CoDress").size(28), container(links).align_right(Length::Fill)]
        .align_y(Alignment::Center)
        .padding(16);

    column![bar, body].into()
}

pub fn loading<'a>() -> Element<'a, Message> {
    center(text("Loading...")).into()
}

fn error_text<'a>(message: Option<String>) -> Option<Element<'a, Message>> {
    message.map(|message| text(message).style(text::danger).into())
}

pub fn login(form: &LoginForm) -> Element<'_, Message> {
    let submit = button(text(if form.pending { "Logging in..." } else { "Log in" }))
        .on_press_maybe((!form.pending).then_some(Message::LoginSubmit))
        .padding(10);

    let content = column![
        text("Log in").size(32),
        text_input("Username", &form.username)
            .on_input(Message::LoginUsernameChanged)
            .on_submit(Message::LoginSubmit)
            .padding(10),
        text_input("Password", &form.password)
            .on_input(Message::LoginPasswordChanged)
            .on_submit(Message::LoginSubmit)
            .secure(true)
            .padding(10),
    ]
    .push_maybe(error_text(form.error.clone()))
    .push(submit)
    .push(
        button(text("Create an account"))
            .on_press(Message::Navigate(Route::Register))
            .style(button::text),
    )
    .spacing(16)
    .width(FORM_WIDTH);

    center(content).into()
}

pub fn register(form: &RegisterForm) -> Element<'_, Message> {
    let submit = button(text(if form.pending { "Registering..." } else { "Register" }))
        .on_press_maybe((!form.pending).then_some(Message::RegisterSubmit))
        .padding(10);

    let content = column![
        text("Create an account").size(32),
        text_input("Username", &form.username)
            .on_input(Message::RegisterUsernameChanged)
            .padding(10),
        text_input("Password", &form.password)
            .on_input(Message::RegisterPasswordChanged)
            .secure(true)
            .padding(10),
        text_input("Confirm password", &form.confirmation)
            .on_input(Message::RegisterConfirmChanged)
            .on_submit(Message::RegisterSubmit)
            .secure(true)
            .padding(10),
    ]
    .push_maybe(error_text(form.error.clone()))
    .push_maybe(
        form.notice
            .as_deref()
            .map(|notice| text(notice).style(text::success)),
    )
    .push(submit)
    .push(
        button(text("Already registered? Log in"))
            .on_press(Message::Navigate(Route::Login))
            .style(button::text),
    )
    .spacing(16)
    .width(FORM_WIDTH);

    center(content).into()
}

/// File picking, previews and the submit button, shared by page and modal
fn upload_panel<'a>(
    upload: &'a UploadCoordinator,
    thumbnails: &'a PreviewCache,
    target: UploadTarget,
) -> Column<'a, Message> {
    let idle = !upload.is_uploading();
    let pickers = row![
        button(text("Choose photos"))
            .on_press_maybe(idle.then_some(Message::PickFiles(target)))
            .style(button::secondary)
            .padding(10),
        button(text("Choose folder"))
            .on_press_maybe(idle.then_some(Message::PickFolder(target)))
            .style(button::secondary)
            .padding(10),
    ]
    .spacing(10);

    let previews: Vec<Element<'a, Message>> = upload
        .previews()
        .iter()
        .map(|preview| {
            let picture: Element<'a, Message> = match thumbnails.get(preview.id) {
                Some(handle) => image(handle.clone()).width(CARD_SIZE).height(CARD_SIZE).into(),
                None => center(text("...")).width(CARD_SIZE).height(CARD_SIZE).into(),
            };
            column![picture, text(preview.file_name.as_str()).size(12)]
                .spacing(4)
                .width(CARD_SIZE)
                .into()
        })
        .collect();

    let status = if upload.is_uploading() {
        format!("Uploading {} file(s)...", upload.selected().len())
    } else if upload.selected().is_empty() {
        "No files selected".to_string()
    } else {
        format!("{} file(s) selected", upload.selected().len())
    };

    column![
        pickers,
        text(status).size(14),
        Wrap::with_elements(previews).spacing(10.0).line_spacing(10.0),
    ]
    .push_maybe(error_text(upload.last_error().map(str::to_string)))
    .push(
        button(text("Upload"))
            .on_press_maybe(upload.can_submit().then_some(Message::SubmitUpload(target)))
            .padding(10),
    )
    .spacing(16)
}

pub fn upload_page(page: &UploadPage) -> Element<'_, Message> {
    let content = column![text("Upload clothing photos").size(32)]
        .push(upload_panel(&page.upload, &page.thumbnails, UploadTarget::Page))
        .spacing(20)
        .padding(40);

    scrollable(content).into()
}

fn card_picture<'a>(content: &CardContent, images: &ImageCache) -> Element<'a, Message> {
    let picture: Element<'a, Message> = match content {
        CardContent::Image { url } => match images.get(url) {
            Some(CachedImage::Ready(handle)) => image(handle.clone())
                .width(CARD_SIZE)
                .height(CARD_SIZE)
                .into(),
            Some(CachedImage::Broken) => center(text("Image unavailable").size(12)).into(),
            _ => center(text("Loading...").size(12)).into(),
        },
        CardContent::Invalid { reason } => center(
            column![
                text("Invalid image data").style(text::danger),
                text(reason.clone()).size(11),
            ]
            .align_x(Alignment::Center)
            .spacing(4),
        )
        .into(),
    };
    container(picture)
        .width(CARD_SIZE)
        .height(CARD_SIZE)
        .style(container::rounded_box)
        .into()
}

fn grid_or<'a>(cards: Vec<Element<'a, Message>>, empty: Option<&'static str>) -> Element<'a, Message> {
    match empty {
        Some(message) => text(message).size(14).into(),
        None => Wrap::with_elements(cards).spacing(12.0).line_spacing(12.0).into(),
    }
}

pub fn wardrobe<'a>(screen: &'a WardrobeScreen, origin: &Url) -> Element<'a, Message> {
    let view = gallery::project(screen.registry.state(), screen.search.state(), origin);

    let image_cards: Vec<Element<'a, Message>> = view
        .images
        .iter()
        .map(|card| {
            column![
                card_picture(&card.content, &screen.images),
                text(card.title.clone()).size(12),
            ]
            .spacing(4)
            .width(CARD_SIZE)
            .into()
        })
        .collect();

    let match_cards: Vec<Element<'a, Message>> = view
        .matches
        .iter()
        .map(|card| {
            column![card_picture(&card.content, &screen.images)]
            .push_maybe(
                card.percent
                    .map(|percent| text(format!("{percent}% match")).size(14)),
            )
            .push_maybe(
                card.matched_query
                    .as_ref()
                    .map(|query| text(format!("Matches: \"{query}\"")).size(12)),
            )
            .spacing(4)
            .width(CARD_SIZE)
            .into()
        })
        .collect();

    let uploading = screen.upload.is_uploading();
    let gallery_header = row![
        text(view.image_heading.clone()).size(24),
        button(text(if view.loading { "Refreshing..." } else { "Refresh" }))
            .on_press_maybe((!view.loading && !uploading).then_some(Message::RefreshImages))
            .style(button::secondary),
        button(text("Upload photos"))
            .on_press_maybe((!uploading).then_some(Message::OpenUploadModal)),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    let gallery_column = column![gallery_header]
        .push_maybe(error_text(view.registry_error.clone()))
        .push(grid_or(image_cards, view.images_empty_text))
        .spacing(16)
        .width(Length::FillPortion(3));

    let styles = StyleFilter::ALL.iter().fold(row![].spacing(8), |styles, style| {
        let chosen = *style == screen.style;
        styles.push(
            button(text(style.label()))
                .on_press(Message::StyleSelected(*style))
                .style(if chosen { button::primary } else { button::secondary }),
        )
    });

    let search_column = column![
        text("Find an outfit").size(24),
        styles,
        text_input("e.g. blue jacket and white shirt", &screen.query)
            .on_input(Message::QueryChanged)
            .on_submit(Message::SearchPressed)
            .padding(10),
        button(text(if view.searching { "Searching..." } else { "Search" }))
            .on_press_maybe((!view.searching).then_some(Message::SearchPressed))
            .padding(10),
    ]
    .push_maybe(error_text(view.search_error.clone()))
    .push(grid_or(match_cards, view.matches_empty_text))
    .spacing(16)
    .width(Length::FillPortion(2));

    let base: Element<'a, Message> = scrollable(
        row![gallery_column, search_column]
            .spacing(32)
            .padding(24),
    )
    .into();

    if screen.modal_open {
        let dialog = container(
            column![text("Upload photos").size(24)]
                .push(upload_panel(
                    &screen.upload,
                    &screen.thumbnails,
                    UploadTarget::Modal(screen.mount_id),
                ))
                .push(
                    button(text("Cancel"))
                        .on_press_maybe((!uploading).then_some(Message::CloseUploadModal))
                        .style(button::secondary),
                )
                .spacing(16),
        )
        .width(640.0)
        .padding(24)
        .style(container::rounded_box);

        modal(base, dialog.into(), Message::CloseUploadModal)
    } else {
        base
    }
}

fn modal<'a>(
    base: Element<'a, Message>,
    content: Element<'a, Message>,
    on_blur: Message,
) -> Element<'a, Message> {
    stack![
        base,
        opaque(
            mouse_area(center(opaque(content)).style(|_theme| container::Style {
                background: Some(
                    Color {
                        a: 0.8,
                        ..Color::BLACK
                    }
                    .into(),
                ),
                ..container::Style::default()
            }))
            .on_press(on_blur)
        )
    ]
    .into()
}
