mod assets;
mod audio;
mod square;

use std::env;

use assets::{BoardTheme, PIECE_IMAGES};
use grandmaster::engine::uci::UciEngine;
use grandmaster::engine::{MoveProvider, SearchReply};
use grandmaster::rules::GameOutcome;
use grandmaster::selection::Cursor;
use grandmaster::session::{side_name, EngineOutcome, GameSession, Opponent};
use iced::{
    widget::{button, container, image, scrollable, text, Space},
    Alignment, Application, Color, Command, Element, Length, Settings,
};
use iced_native::{
    column,
    image::Handle,
    widget::{Column, Row},
};
use log::{debug, info, warn};
use shakmaty::{Color as Side, File, Rank, Square as BoardSquare};
use square::{square, Marks};

const ERROR_RED: Color = Color::from_rgb(0.86, 0.3, 0.3);

fn main() -> iced::Result {
    env_logger::init();

    Game::run(Settings {
        flags: GameInitialization {
            fen: env::var("GRANDMASTER_FEN").ok(),
            engine_command: env::var("GRANDMASTER_ENGINE")
                .unwrap_or_else(|_| "stockfish".to_string()),
            search_depth: env::var("GRANDMASTER_DEPTH")
                .ok()
                .and_then(|depth| depth.parse().ok())
                .unwrap_or(12),
            theme: env::var("GRANDMASTER_THEME").unwrap_or_default(),
        },
        ..Settings::default()
    })
}

#[derive(Debug, Default)]
struct GameInitialization {
    fen: Option<String>,
    engine_command: String,
    search_depth: u32,
    theme: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Menu,
    Playing,
}

struct Game {
    session: GameSession,
    cursor: Cursor,
    engine: UciEngine,
    mixer: audio::Mixer,
    theme: BoardTheme,
    screen: Screen,
    start_fen: Option<String>,
}

#[derive(Debug, Clone)]
enum Message {
    StartGame(Opponent),
    BackToMenu,
    SquareClicked(BoardSquare),
    EngineReplied {
        ticket: u64,
        result: Result<SearchReply, String>,
    },
    Undo,
    Reset,
    PlayAs(Side),
    ToggleMute,
}

fn new_session(start_fen: Option<&str>, opponent: Opponent) -> GameSession {
    match start_fen {
        Some(fen) => GameSession::with_start_fen(opponent, fen).unwrap_or_else(|error| {
            warn!("ignoring start position: {error:#}");
            GameSession::new(opponent)
        }),
        None => GameSession::new(opponent),
    }
}

impl Game {
    /// Opens an engine exchange if the session wants one and bridges its
    /// oneshot reply back into the update loop.
    fn request_engine_move(&mut self) -> Command<Message> {
        let Some((ticket, request)) = self.session.begin_engine_request() else {
            return Command::none();
        };
        info!(
            "requesting an engine move for {} ({} to play)",
            request.fen,
            side_name(request.side_to_move)
        );
        let receiver = self.engine.request_move(request);
        Command::perform(
            async move {
                match receiver.await {
                    Ok(Ok(reply)) => Ok(reply),
                    Ok(Err(error)) => Err(format!("{error:#}")),
                    Err(_) => Err("the engine worker went away".to_string()),
                }
            },
            move |result| Message::EngineReplied { ticket, result },
        )
    }

    fn play_move_cue(&self) {
        if let Some(record) = self.session.arbiter().history().last() {
            self.mixer.play(audio::cue(record, self.session.outcome()));
        }
    }
}

impl Application for Game {
    type Executor = iced::executor::Default;

    type Message = Message;

    type Theme = iced::Theme;

    type Flags = GameInitialization;

    fn new(flags: GameInitialization) -> (Self, Command<Self::Message>) {
        let game = Game {
            session: new_session(flags.fen.as_deref(), Opponent::Human),
            cursor: Cursor::default(),
            engine: UciEngine::new(flags.engine_command, flags.search_depth),
            mixer: audio::Mixer::new(),
            theme: assets::theme(&flags.theme),
            screen: Screen::Menu,
            start_fen: flags.fen,
        };
        (game, Command::none())
    }

    fn title(&self) -> String {
        "Grandmaster".to_string()
    }

    fn update(&mut self, message: Self::Message) -> Command<Message> {
        match message {
            Message::StartGame(opponent) => {
                self.session = new_session(self.start_fen.as_deref(), opponent);
                self.cursor.clear();
                self.screen = Screen::Playing;
                self.request_engine_move()
            }
            Message::BackToMenu => {
                self.screen = Screen::Menu;
                Command::none()
            }
            Message::SquareClicked(clicked) => {
                if let Some(candidate) = self.cursor.click(clicked, &self.session) {
                    if self.session.submit(candidate) {
                        self.cursor.clear();
                        self.play_move_cue();
                        return self.request_engine_move();
                    }
                }
                Command::none()
            }
            Message::EngineReplied { ticket, result } => {
                match self.session.finish_engine_request(ticket, result) {
                    EngineOutcome::Applied(record) => {
                        debug!("engine played {}", record.san);
                        self.cursor.clear();
                        self.play_move_cue();
                    }
                    EngineOutcome::Failed => {
                        // no retry: the turn stays unresolved until undo/reset
                        warn!(
                            "engine request failed: {}",
                            self.session.error().unwrap_or("unknown error")
                        );
                    }
                    EngineOutcome::Stale => debug!("discarded a stale engine reply"),
                }
                Command::none()
            }
            Message::Undo => {
                // when the human plays black, undoing everything hands the
                // opening move back to the engine
                self.session.undo();
                self.cursor.clear();
                self.request_engine_move()
            }
            Message::Reset => {
                self.session.reset();
                self.cursor.clear();
                self.request_engine_move()
            }
            Message::PlayAs(color) => {
                self.session = new_session(self.start_fen.as_deref(), Opponent::Engine {
                    human: color,
                });
                self.cursor.clear();
                self.request_engine_move()
            }
            Message::ToggleMute => {
                self.mixer.toggle();
                Command::none()
            }
        }
    }

    fn view(&self) -> Element<'_, Self::Message> {
        match self.screen {
            Screen::Menu => self.menu(),
            Screen::Playing => self.board_screen(),
        }
    }
}

impl Game {
    fn menu(&self) -> Element<'_, Message> {
        let tile = |title: &'static str, description: &'static str, message: Message| {
            button(
                column![text(title).size(24), text(description).size(14)].spacing(4),
            )
            .on_press(message)
            .padding(16)
            .width(Length::Fixed(380.0))
        };

        container(
            column![
                text("Grandmaster").size(48),
                text("Classic chess against a friend or a UCI engine.").size(16),
                Space::with_height(Length::Fixed(24.0)),
                tile(
                    "Play vs Engine",
                    "Challenge a UCI engine running on this machine.",
                    Message::StartGame(Opponent::Engine { human: Side::White }),
                ),
                tile(
                    "Pass & Play",
                    "Local multiplayer. Pass the seat to your friend.",
                    Message::StartGame(Opponent::Human),
                ),
            ]
            .spacing(12)
            .align_items(Alignment::Center),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x()
        .center_y()
        .into()
    }

    fn board_screen(&self) -> Element<'_, Message> {
        let square_length = 80.0;
        let arbiter = self.session.arbiter();
        let check_square = arbiter.checked_king();
        let last_move = self.session.last_move();
        let flipped = matches!(
            self.session.opponent(),
            Opponent::Engine { human: Side::Black }
        );

        let board = {
            let mut ranks = Vec::<Element<Message>>::new();
            for display_rank in 0..8u32 {
                let rank = if flipped {
                    Rank::new(display_rank)
                } else {
                    Rank::new(7 - display_rank)
                };
                let mut cells = Vec::<Element<_>>::new();
                for display_file in 0..8u32 {
                    let file = if flipped {
                        File::new(7 - display_file)
                    } else {
                        File::new(display_file)
                    };
                    let board_square = BoardSquare::from_coords(file, rank);
                    let piece_image = arbiter.piece_at(board_square).map(|piece| {
                        let handle =
                            Handle::from_path(&PIECE_IMAGES[&(piece.color, piece.role)]);
                        image(handle)
                    });
                    let marks = Marks {
                        selected: self.cursor.selected_square() == Some(board_square),
                        valid_move: self.cursor.is_destination(board_square),
                        last_move: last_move
                            .map(|(from, to)| from == board_square || to == board_square)
                            .unwrap_or(false),
                        check: check_square == Some(board_square),
                    };

                    cells.push(
                        button(square(
                            &self.theme,
                            (u32::from(file) + u32::from(rank)) % 2 == 0,
                            square_length,
                            piece_image,
                            marks,
                        ))
                        .on_press(Message::SquareClicked(board_square))
                        .padding(0.0)
                        .into(),
                    );
                }
                ranks.push(Row::with_children(cells).into());
            }
            Column::with_children(ranks)
        }
        .padding(0)
        .spacing(0)
        .align_items(Alignment::Center);

        let row = Row::with_children(vec![board.into(), self.panel()])
            .padding(20)
            .spacing(32)
            .align_items(Alignment::Start);

        container(row)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x()
            .center_y()
            .into()
    }

    fn panel(&self) -> Element<'_, Message> {
        let arbiter = self.session.arbiter();
        let mut panel = Vec::<Element<Message>>::new();

        if let GameOutcome::Checkmate { winner } = self.session.outcome() {
            panel.push(
                column![
                    text(format!("{} wins!", side_name(winner))).size(32),
                    button(text("Play Again")).on_press(Message::Reset),
                ]
                .spacing(8)
                .align_items(Alignment::Center)
                .into(),
            );
        }

        let status = self.session.status_line();
        let banner = if self.session.awaiting_engine() {
            "Engine is thinking...".to_string()
        } else if status.is_empty() {
            format!("Turn: {}", side_name(arbiter.turn()))
        } else {
            status
        };
        panel.push(text(banner).size(20).into());

        if let Some(error) = self.session.error() {
            panel.push(
                text(format!("Error: {error}"))
                    .size(14)
                    .style(iced::theme::Text::Color(ERROR_RED))
                    .into(),
            );
        }

        if let Some(evaluation) = self.session.evaluation() {
            panel.push(text(format!("Engine: {evaluation}")).size(14).into());
        }

        let captured = arbiter.captured();
        panel.push(captured_row("White lost", Side::White, &captured.white));
        panel.push(captured_row("Black lost", Side::Black, &captured.black));

        let mut lines = Vec::<Element<Message>>::new();
        for (number, pair) in arbiter.history().chunks(2).enumerate() {
            let white = pair.first().map(|r| r.san.as_str()).unwrap_or("");
            let black = pair.get(1).map(|r| r.san.as_str()).unwrap_or("");
            lines.push(
                text(format!("{}. {white}  {black}", number + 1))
                    .size(14)
                    .into(),
            );
        }
        panel.push(
            scrollable(Column::with_children(lines).spacing(2))
                .height(Length::Fixed(220.0))
                .into(),
        );

        panel.push(
            Row::with_children(vec![
                button(text("Undo")).on_press(Message::Undo).into(),
                button(text("New Game")).on_press(Message::Reset).into(),
                button(text(if self.mixer.enabled() { "Mute" } else { "Unmute" }))
                    .on_press(Message::ToggleMute)
                    .into(),
                button(text("Menu")).on_press(Message::BackToMenu).into(),
            ])
            .spacing(8)
            .into(),
        );

        if matches!(self.session.opponent(), Opponent::Engine { .. }) {
            panel.push(
                Row::with_children(vec![
                    button(text("Play White"))
                        .on_press(Message::PlayAs(Side::White))
                        .into(),
                    button(text("Play Black"))
                        .on_press(Message::PlayAs(Side::Black))
                        .into(),
                ])
                .spacing(8)
                .into(),
            );
        }

        Column::with_children(panel)
            .spacing(16)
            .width(Length::Fixed(320.0))
            .into()
    }
}

fn captured_row(
    label: &str,
    side: Side,
    roles: &[shakmaty::Role],
) -> Element<'static, Message> {
    let mut cells: Vec<Element<Message>> = vec![text(format!("{label}:")).size(14).into()];
    for role in roles {
        let handle = Handle::from_path(&PIECE_IMAGES[&(side, *role)]);
        cells.push(image(handle).width(Length::Fixed(24.0)).into());
    }
    Row::with_children(cells)
        .spacing(4)
        .align_items(Alignment::Center)
        .into()
}
