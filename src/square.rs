use iced::{Color, Length, Size};
use iced_native::{
    layout::Node,
    renderer::Quad,
    widget::{tree, Tree},
    Element, Renderer, Widget,
};

use crate::assets::BoardTheme;

const SELECTED_OVERLAY: Color = Color::from_rgba(0.68, 0.40, 0.76, 0.8);
const CHECK_OVERLAY: Color = Color::from_rgba(0.8, 0.0, 0.0, 0.55);

/// Per-square display state derived from the cursor and the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Marks {
    pub selected: bool,
    pub valid_move: bool,
    pub last_move: bool,
    pub check: bool,
}

pub fn square<'a, Message, R: Renderer>(
    theme: &BoardTheme,
    bg_dark: bool,
    length: f32,
    content: Option<impl Into<Element<'a, Message, R>>>,
    marks: Marks,
) -> Square<'a, Message, R> {
    // a square is never both the selection and one of its destinations
    assert!(!marks.selected || !marks.valid_move);

    Square {
        background: if bg_dark { theme.dark } else { theme.light },
        last_move_overlay: theme.last_move,
        valid_move_overlay: theme.valid_move,
        length,
        content: content.map(|c| c.into()),
        marks,
    }
}

pub struct Square<'a, Message, R: Renderer> {
    background: Color,
    last_move_overlay: Color,
    valid_move_overlay: Color,
    length: f32,
    content: Option<Element<'a, Message, R>>,
    marks: Marks,
}

impl<Message, R: Renderer> Widget<Message, R> for Square<'_, Message, R> {
    fn width(&self) -> Length {
        Length::Fixed(self.length)
    }

    fn height(&self) -> Length {
        Length::Fixed(self.length)
    }

    fn layout(
        &self,
        _renderer: &R,
        _limits: &iced_native::layout::Limits,
    ) -> iced_native::layout::Node {
        Node::new(Size::new(self.length, self.length))
    }

    fn draw(
        &self,
        state: &Tree,
        renderer: &mut R,
        theme: &<R as iced_native::Renderer>::Theme,
        style: &iced_native::renderer::Style,
        layout: iced_native::Layout<'_>,
        cursor_position: iced::Point,
        viewport: &iced::Rectangle,
    ) {
        let fill = |renderer: &mut R, color: Color, border_width: f32| {
            renderer.fill_quad(
                Quad {
                    bounds: layout.bounds(),
                    border_radius: 0.0.into(),
                    border_width,
                    border_color: Color::BLACK,
                },
                color,
            );
        };

        renderer.with_layer(layout.bounds(), |renderer| {
            fill(renderer, self.background, 2.0);
        });

        if self.marks.last_move {
            renderer.with_layer(layout.bounds(), |renderer| {
                fill(renderer, self.last_move_overlay, 0.0);
            });
        }

        if self.marks.selected || self.marks.valid_move {
            let color = if self.marks.selected {
                SELECTED_OVERLAY
            } else {
                self.valid_move_overlay
            };
            renderer.with_layer(layout.bounds(), |renderer| {
                fill(renderer, color, 0.0);
            });
        }

        renderer.with_layer(layout.bounds(), |renderer| {
            if let Some(content) = self.content.as_ref() {
                content.as_widget().draw(
                    state,
                    renderer,
                    theme,
                    style,
                    layout,
                    cursor_position,
                    viewport,
                );
            }
        });

        if self.marks.check {
            renderer.with_layer(layout.bounds(), |renderer| {
                fill(renderer, CHECK_OVERLAY, 0.0);
            });
        }
    }

    fn tag(&self) -> tree::Tag {
        tree::Tag::stateless()
    }

    fn state(&self) -> tree::State {
        tree::State::None
    }

    fn children(&self) -> Vec<Tree> {
        if let Some(content) = self.content.as_ref() {
            vec![Tree::new(content)]
        } else {
            vec![]
        }
    }

    fn diff(&self, tree: &mut Tree) {
        if let Some(content) = self.content.as_ref() {
            tree.diff(content)
        }
    }
}

impl<'a, M: 'a, R: 'a> From<Square<'a, M, R>> for Element<'a, M, R>
where
    R: Renderer,
{
    fn from(value: Square<'a, M, R>) -> Self {
        Self::new(value)
    }
}
