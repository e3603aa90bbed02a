//! Fixed-tick pong simulation.
//!
//! Pure state plus a step function; the session engine drives it once per
//! tick and everything here is testable without the runtime. Coordinates
//! are centered: the origin is mid-field, slot one defends the left edge,
//! slot two the right.

use rand::Rng;
use shared::{
    GameMode, KeyDirection, BALL_STEP, MAX_PADDLE_OFFSET, PADDLE_HEIGHT, PADDLE_PLANE, PADDLE_STEP,
    SCORE_PLANE, SERVE_SPEED_MAX, SERVE_SPEED_MIN, WALL_PLANE,
};

/// Which side of the arena a participant occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

/// Complete per-session simulation state.
///
/// Paddle values are vertical offsets from mid-field, always within
/// [-MAX_PADDLE_OFFSET, MAX_PADDLE_OFFSET]. Intents are the clamped key
/// state each slot is currently holding: -1 up, 0 idle, +1 down.
#[derive(Debug, Clone)]
pub struct PongState {
    pub paddle1: f32,
    pub paddle2: f32,
    pub intent1: i8,
    pub intent2: i8,
    pub ball: Ball,
    pub score1: u8,
    pub score2: u8,
}

fn serve_speed(rng: &mut impl Rng) -> f32 {
    let magnitude = rng.gen_range(SERVE_SPEED_MIN..SERVE_SPEED_MAX);
    if rng.gen_bool(0.5) {
        magnitude
    } else {
        -magnitude
    }
}

fn serve(rng: &mut impl Rng) -> Ball {
    Ball {
        x: 0.0,
        y: 0.0,
        dx: serve_speed(rng),
        dy: serve_speed(rng),
    }
}

impl PongState {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self {
            paddle1: 0.0,
            paddle2: 0.0,
            intent1: 0,
            intent2: 0,
            ball: serve(rng),
            score1: 0,
            score2: 0,
        }
    }

    /// Applies one key event to a slot's held intent.
    ///
    /// Intent is a clamped signed unit value: holding both directions at
    /// once cancels out, and repeated presses of the same key do not stack.
    pub fn apply_intent(&mut self, slot: Slot, direction: KeyDirection) {
        let intent = match slot {
            Slot::One => &mut self.intent1,
            Slot::Two => &mut self.intent2,
        };
        *intent = match direction {
            KeyDirection::Up => (*intent - 1).clamp(-1, 1),
            KeyDirection::Down => (*intent + 1).clamp(-1, 1),
            KeyDirection::Released => 0,
        };
    }

    pub fn score_of(&self, slot: Slot) -> u8 {
        match slot {
            Slot::One => self.score1,
            Slot::Two => self.score2,
        }
    }

    /// Advances the simulation by one tick. Returns the slot that scored
    /// this tick, if any.
    ///
    /// Order matters: paddles move first so a contact check sees the paddle
    /// where the player put it, walls resolve before paddles so a corner
    /// ball reflects cleanly, and scoring is checked last against the
    /// post-contact position.
    pub fn step(&mut self, mode: GameMode, rng: &mut impl Rng) -> Option<Slot> {
        self.paddle1 = (self.paddle1 + f32::from(self.intent1) * PADDLE_STEP)
            .clamp(-MAX_PADDLE_OFFSET, MAX_PADDLE_OFFSET);
        self.paddle2 = (self.paddle2 + f32::from(self.intent2) * PADDLE_STEP)
            .clamp(-MAX_PADDLE_OFFSET, MAX_PADDLE_OFFSET);

        self.ball.x += self.ball.dx * BALL_STEP;
        self.ball.y += self.ball.dy * BALL_STEP;

        match mode {
            GameMode::Classic => {
                // Reflect: mirror the overshoot back inside and flip dy.
                if self.ball.y >= WALL_PLANE && self.ball.dy > 0.0 {
                    self.ball.dy = -self.ball.dy;
                    self.ball.y = 2.0 * WALL_PLANE - self.ball.y;
                } else if self.ball.y <= -WALL_PLANE && self.ball.dy < 0.0 {
                    self.ball.dy = -self.ball.dy;
                    self.ball.y = -2.0 * WALL_PLANE - self.ball.y;
                }
            }
            GameMode::Wrap => {
                // Teleport to the opposite wall, velocity unchanged.
                if self.ball.y >= WALL_PLANE && self.ball.dy > 0.0 {
                    self.ball.y -= 2.0 * WALL_PLANE;
                } else if self.ball.y <= -WALL_PLANE && self.ball.dy < 0.0 {
                    self.ball.y += 2.0 * WALL_PLANE;
                }
            }
        }

        // Paddle contact mirrors the ball about the contact plane instead of
        // just flipping velocity, so a fast ball cannot tunnel through or
        // stick inside the paddle.
        let half_paddle = PADDLE_HEIGHT / 2.0;
        if self.ball.x <= -PADDLE_PLANE
            && self.ball.dx < 0.0
            && (self.ball.y - self.paddle1).abs() <= half_paddle
        {
            self.ball.x = -2.0 * PADDLE_PLANE - self.ball.x;
            self.ball.dx = -self.ball.dx;
        } else if self.ball.x >= PADDLE_PLANE
            && self.ball.dx > 0.0
            && (self.ball.y - self.paddle2).abs() <= half_paddle
        {
            self.ball.x = 2.0 * PADDLE_PLANE - self.ball.x;
            self.ball.dx = -self.ball.dx;
        }

        if self.ball.x >= SCORE_PLANE {
            self.score1 += 1;
            self.reset_round(rng);
            Some(Slot::One)
        } else if self.ball.x <= -SCORE_PLANE {
            self.score2 += 1;
            self.reset_round(rng);
            Some(Slot::Two)
        } else {
            None
        }
    }

    /// After a goal: paddles re-center, held intents clear, fresh serve.
    fn reset_round(&mut self, rng: &mut impl Rng) {
        self.paddle1 = 0.0;
        self.paddle2 = 0.0;
        self.intent1 = 0;
        self.intent2 = 0;
        self.ball = serve(rng);
    }
}
