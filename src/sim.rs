//! Ball and paddle simulation.
//!
//! The arena is a fixed 32x16 grid. The ball moves one column per tick
//! and a fractional number of rows; paddles are six rows tall and move at
//! most one row per tick toward a target chosen by a deliberately
//! imperfect AI.
//!
//! The clock is encoded in the match: at second 0 one paddle is told to
//! miss, so the ball leaves on the left when a minute completes and on
//! the right when an hour completes. During second 59 the digits are
//! frozen so the point plays out against the old time.
//!
//! This module is pure: no I/O, no threads. Randomness comes from the
//! `StdRng` owned by each `Simulation`, so tests can seed it.

use crate::config::{ClockConfig, DEFAULT_TIME_FORMAT};
use crate::palette::Palette;
use chrono::{Local, NaiveTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt::Write;
use std::ops::RangeInclusive;

pub const ARENA_WIDTH: i32 = 32;
pub const ARENA_HEIGHT: i32 = 16;
pub const CENTER_COLUMN: i32 = 16;
pub const MAX_ROW: f32 = 15.0;

pub const PADDLE_WIDTH: i32 = 2;
pub const PADDLE_HEIGHT: i32 = 6;
pub const PADDLE_MAX_ROW: i32 = ARENA_HEIGHT - PADDLE_HEIGHT;

/// Ticks the ball sits frozen at the center after each point.
pub const RESTART_TICKS: u32 = 25;

const SERVE_ROWS: RangeInclusive<i32> = 4..=10;
const SERVE_SPEED_Y: f32 = 0.5;
const FLICK_STEP: f32 = 0.2;
const MIN_SPEED_Y: f32 = 0.2;
const MAX_SPEED_Y: f32 = 2.0;

/// Interception error: the paddle aims this far above the predicted row.
const AIM_OFFSET: RangeInclusive<i32> = 1..=3;

// ── Time ────────────────────────────────────────────────────────────

/// Where the engine reads the time of day from.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// Local wall-clock time, one second ahead.
///
/// Running a second early means the hold at second 59 shows the minute
/// that is about to finish while the deciding point is played.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl TimeSource for LocalClock {
    fn now(&self) -> NaiveTime {
        (Local::now() + chrono::Duration::seconds(1)).time()
    }
}

// ── Sides ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// First column of the drawn paddle rectangle.
    pub fn draw_column(self) -> i32 {
        match self {
            Side::Left => 1,
            Side::Right => 29,
        }
    }

    /// Ball column that counts as touching the paddle's face.
    pub fn contact_column(self) -> i32 {
        match self {
            Side::Left => 3,
            Side::Right => 28,
        }
    }

    /// Column where the paddle commits to an interception.
    fn predict_column(self) -> i32 {
        match self {
            Side::Left => CENTER_COLUMN - 1,
            Side::Right => CENTER_COLUMN + 1,
        }
    }

    fn is_approached_by(self, vel_x: i32) -> bool {
        match self {
            Side::Left => vel_x < 0,
            Side::Right => vel_x > 0,
        }
    }

    /// How far a flick moves the paddle's own target. The right paddle is
    /// the lazier of the two and sometimes doesn't move at all.
    fn flick_shift(self) -> RangeInclusive<i32> {
        match self {
            Side::Left => 1..=1,
            Side::Right => 0..=1,
        }
    }

    /// Columns where the paddle may lazily follow the ball's row.
    ///
    /// These lie on the far side of the net, so tracking settles before
    /// the interception target is fixed at [`Side::predict_column`].
    fn follow_columns(self) -> RangeInclusive<i32> {
        match self {
            Side::Left => CENTER_COLUMN + 2..=ARENA_WIDTH - 2,
            Side::Right => 4..=CENTER_COLUMN - 2,
        }
    }
}

// ── State ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    pub x: i32,
    pub y: f32,
    pub vel_x: i32,
    pub vel_y: f32,
}

impl Ball {
    fn centered() -> Self {
        Self {
            x: CENTER_COLUMN,
            y: 8.0,
            vel_x: 0,
            vel_y: 0.0,
        }
    }

    pub fn row(&self) -> i32 {
        self.y as i32
    }

    fn in_arena(&self) -> bool {
        (0..ARENA_WIDTH).contains(&self.x)
    }

    /// Advance one tick, bouncing off the top and bottom walls.
    fn advance(&mut self) {
        self.x += self.vel_x;
        self.y += self.vel_y;

        if self.y <= 0.0 {
            self.vel_y = -self.vel_y;
            self.y = 0.0;
        }
        if self.y >= MAX_ROW {
            self.vel_y = -self.vel_y;
            self.y = MAX_ROW;
        }
    }

    /// Nudge the vertical speed by one flick step, keeping the sign of the
    /// result and a magnitude within `[MIN_SPEED_Y, MAX_SPEED_Y]`.
    fn nudge_vel_y(&mut self, delta: f32) {
        let v = self.vel_y + delta;
        self.vel_y = v.signum() * v.abs().clamp(MIN_SPEED_Y, MAX_SPEED_Y);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paddle {
    pub y: i32,
    pub target_y: i32,
    /// Set at a clock boundary: the next interception is thrown.
    pub miss: bool,
}

impl Paddle {
    fn new() -> Self {
        Self {
            y: 5,
            target_y: 5,
            miss: false,
        }
    }

    fn covers(&self, row: i32) -> bool {
        (self.y..self.y + PADDLE_HEIGHT).contains(&row)
    }

    fn aim(&mut self, row: i32) {
        self.target_y = row.clamp(0, PADDLE_MAX_ROW);
    }

    fn step_toward_target(&mut self) {
        if self.y > self.target_y && self.y > 0 {
            self.y -= 1;
        } else if self.y < self.target_y && self.y < PADDLE_MAX_ROW {
            self.y += 1;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flick {
    Down,
    Up,
}

/// Everything the compositor needs to draw one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayFrame {
    pub palette: Palette,
    /// Hour tens, hour ones, minute tens, minute ones.
    pub digits: [char; 4],
    /// Top row of the left and right paddle.
    pub paddles: [i32; 2],
    /// Rounded ball position, only while the ball is live.
    pub ball: Option<(i32, i32)>,
}

/// Read-only view of a running match, published for status reporting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct SimSnapshot {
    pub ticks: u64,
    pub ball_x: i32,
    pub ball_y: f32,
    pub left_paddle: i32,
    pub right_paddle: i32,
    pub restart_countdown: u32,
    pub hold_display: bool,
    pub displayed_time: String,
}

pub struct Simulation {
    ball: Ball,
    paddles: [Paddle; 2],
    restart_countdown: u32,
    hold_display: bool,
    displayed_time: String,
    ticks: u64,
    rng: StdRng,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// A fresh match, seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            ball: Ball::centered(),
            paddles: [Paddle::new(), Paddle::new()],
            restart_countdown: RESTART_TICKS,
            hold_display: false,
            displayed_time: String::new(),
            ticks: 0,
            rng,
        }
    }

    pub fn ball(&self) -> Ball {
        self.ball
    }

    pub fn paddle(&self, side: Side) -> Paddle {
        self.paddles[side.index()]
    }

    pub fn restart_countdown(&self) -> u32 {
        self.restart_countdown
    }

    pub fn hold_display(&self) -> bool {
        self.hold_display
    }

    pub fn displayed_time(&self) -> &str {
        &self.displayed_time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_live(&self) -> bool {
        self.restart_countdown == 0
    }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            ticks: self.ticks,
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            left_paddle: self.paddles[0].y,
            right_paddle: self.paddles[1].y,
            restart_countdown: self.restart_countdown,
            hold_display: self.hold_display,
            displayed_time: self.displayed_time.clone(),
        }
    }

    /// Abandon the rally in progress and start a new point: ball back to
    /// the center, countdown rearmed, hold and both miss flags cleared.
    /// Paddles, tick count and the rng carry on.
    pub fn restart_point(&mut self) {
        self.ball = Ball::centered();
        self.restart_countdown = RESTART_TICKS;
        self.hold_display = false;
        for paddle in &mut self.paddles {
            paddle.miss = false;
        }
    }

    /// Advance the match by exactly one tick.
    ///
    /// The order of the steps matters: it decides who wins ties between a
    /// restart, a clock boundary and a collision landing on the same tick.
    pub fn tick(&mut self, now: NaiveTime, config: &ClockConfig) -> DisplayFrame {
        let palette = Palette::resolve(config.color, config.dim);

        if !self.hold_display {
            self.displayed_time = format_time(now, &config.time_format);
        }
        let digits = clock_digits(&self.displayed_time);

        if self.restart_countdown > 0 {
            self.serve();
        }

        self.read_clock(now);
        self.follow_ball();
        self.plan_interceptions();

        for paddle in &mut self.paddles {
            paddle.step_toward_target();
        }

        self.ball.advance();

        if self.is_live() {
            for side in Side::BOTH {
                self.resolve_contact(side);
            }
        }

        let ball = self
            .is_live()
            .then(|| (self.ball.x, (self.ball.y + 0.5) as i32));

        if !self.ball.in_arena() {
            self.restart_countdown = RESTART_TICKS;
            self.hold_display = false;
        }

        self.ticks += 1;

        DisplayFrame {
            palette,
            digits,
            paddles: [self.paddles[0].y, self.paddles[1].y],
            ball,
        }
    }

    /// Hold the ball at the center; on the last countdown tick, launch it.
    fn serve(&mut self) {
        self.ball.x = CENTER_COLUMN;
        if self.restart_countdown == 1 {
            self.ball.y = self.rng.gen_range(SERVE_ROWS) as f32;
            self.ball.vel_x = if self.rng.gen_bool(0.5) { 1 } else { -1 };
            self.ball.vel_y = if self.rng.gen_bool(0.5) {
                SERVE_SPEED_Y
            } else {
                -SERVE_SPEED_Y
            };
        }
        for paddle in &mut self.paddles {
            paddle.miss = false;
        }
        self.hold_display = false;
        self.restart_countdown -= 1;
    }

    fn read_clock(&mut self, now: NaiveTime) {
        if now.second() == 59 {
            self.hold_display = true;
        }
        if now.second() == 0 {
            // Minute boundary: the ball leaves on the minutes side. Hour
            // boundary: it leaves on the hours side.
            let loser = if now.minute() > 0 { Side::Left } else { Side::Right };
            self.paddles[loser.index()].miss = true;
        }
    }

    /// Loosely track the ball while it's in the opposite court. The
    /// trigger column is redrawn every tick, so a pass may snap the
    /// target zero, one or several times.
    fn follow_ball(&mut self) {
        for side in Side::BOTH {
            let trigger = self.rng.gen_range(side.follow_columns());
            if self.ball.x == trigger {
                self.paddles[side.index()].aim(self.ball.row());
            }
        }
    }

    fn plan_interceptions(&mut self) {
        for side in Side::BOTH {
            if self.ball.x != side.predict_column() || !side.is_approached_by(self.ball.vel_x) {
                continue;
            }

            let end_row = predict_endpoint(self.ball);
            let target = if self.paddles[side.index()].miss {
                self.paddles[side.index()].miss = false;
                // Park the paddle in the other half of the arena.
                if end_row > ARENA_HEIGHT / 2 {
                    self.rng.gen_range(0..=1)
                } else {
                    self.rng.gen_range(PADDLE_MAX_ROW - 1..=PADDLE_MAX_ROW)
                }
            } else {
                end_row - self.rng.gen_range(AIM_OFFSET)
            };
            self.paddles[side.index()].aim(target);
        }
    }

    fn resolve_contact(&mut self, side: Side) {
        let paddle = self.paddles[side.index()];
        if self.ball.x != side.contact_column() || !paddle.covers(self.ball.row()) {
            return;
        }

        self.ball.vel_x = -self.ball.vel_x;

        // One in three returns is flat.
        if self.rng.gen_ratio(1, 3) {
            return;
        }

        let flick = if paddle.y <= 1 {
            Flick::Down
        } else if paddle.y >= PADDLE_MAX_ROW - 2 {
            Flick::Up
        } else if self.rng.gen_bool(0.5) {
            Flick::Down
        } else {
            Flick::Up
        };

        let shift = self.rng.gen_range(side.flick_shift());
        let paddle = &mut self.paddles[side.index()];
        match flick {
            Flick::Down => {
                paddle.aim(paddle.target_y + shift);
                self.ball.nudge_vel_y(FLICK_STEP);
            }
            Flick::Up => {
                paddle.aim(paddle.target_y - shift);
                self.ball.nudge_vel_y(-FLICK_STEP);
            }
        }
    }
}

/// Row where the ball would reach the paddle it's heading for if no paddle
/// were in the way. Uses the same wall bounce as live play, so a paddle
/// that parks away from this row is guaranteed to miss.
pub fn predict_endpoint(ball: Ball) -> i32 {
    if ball.vel_x == 0 {
        return ball.row();
    }

    let mut ghost = ball;
    let left = Side::Left.contact_column();
    let right = Side::Right.contact_column();
    while ghost.x > left && ghost.x < right {
        ghost.advance();
    }
    ghost.row()
}

/// Render `now` with a strftime pattern, falling back to the default
/// pattern when the configured one can't be rendered.
pub fn format_time(now: NaiveTime, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_ok() {
        return out;
    }
    out.clear();
    // The default pattern is known to be valid.
    let _ = write!(out, "{}", now.format(DEFAULT_TIME_FORMAT));
    out
}

/// Pick the four drawn characters out of a formatted time. Positions
/// 0, 1, 3 and 4 hold the digits of `hh:mm`; missing ones draw blank.
pub fn clock_digits(displayed: &str) -> [char; 4] {
    let chars: Vec<char> = displayed.chars().collect();
    [0, 1, 3, 4].map(|i| chars.get(i).copied().unwrap_or(' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn config() -> ClockConfig {
        ClockConfig::default()
    }

    /// A live ball in mid-court where no step other than the one under
    /// test can touch it.
    fn live_sim(ball: Ball) -> Simulation {
        let mut sim = Simulation::seeded(7);
        sim.restart_countdown = 0;
        sim.ball = ball;
        sim
    }

    /// Run `ticks` ticks with time advancing one second every 25 ticks.
    fn run(
        sim: &mut Simulation,
        start: NaiveTime,
        ticks: usize,
        mut each: impl FnMut(&Simulation, &DisplayFrame),
    ) {
        let cfg = config();
        for i in 0..ticks {
            let now = start + chrono::Duration::seconds((i / 25) as i64);
            let frame = sim.tick(now, &cfg);
            each(sim, &frame);
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[rstest]
    #[case("03:15:58", ['0', '3', '1', '5'])]
    #[case("12:00", ['1', '2', '0', '0'])]
    #[case("9:5", ['9', ':', ' ', ' '])]
    #[case("", [' ', ' ', ' ', ' '])]
    fn test_clock_digits(#[case] displayed: &str, #[case] expected: [char; 4]) {
        assert_eq!(clock_digits(displayed), expected);
    }

    #[test]
    fn format_time_uses_twelve_hour_default() {
        assert_eq!(format_time(hms(15, 7, 9), DEFAULT_TIME_FORMAT), "03:07:09");
    }

    #[test]
    fn format_time_falls_back_on_bad_pattern() {
        assert_eq!(format_time(hms(15, 7, 9), "%Q"), "03:07:09");
    }

    #[rstest]
    #[case(15, 8.0, -1, 0.5, 14)]
    #[case(15, 8.0, -1, -0.5, 2)]
    #[case(17, 8.0, 1, 0.0, 8)]
    #[case(17, 14.0, 1, 1.0, 5)]
    fn test_predict_endpoint(
        #[case] x: i32,
        #[case] y: f32,
        #[case] vel_x: i32,
        #[case] vel_y: f32,
        #[case] expected: i32,
    ) {
        let ball = Ball { x, y, vel_x, vel_y };
        assert_eq!(predict_endpoint(ball), expected);
    }

    #[test]
    fn predict_endpoint_matches_unobstructed_flight() {
        let start = Ball {
            x: 17,
            y: 3.0,
            vel_x: 1,
            vel_y: -1.5,
        };
        let predicted = predict_endpoint(start);
        let mut ball = start;
        while ball.x < Side::Right.contact_column() {
            ball.advance();
        }
        assert_eq!(predicted, ball.row());
    }

    // ── Restart choreography ───────────────────────────────────────

    #[test]
    fn fresh_match_holds_ball_at_center_until_serve() {
        let mut sim = Simulation::seeded(1);
        let cfg = config();
        for expected in (1..RESTART_TICKS).rev() {
            let frame = sim.tick(hms(10, 30, 10), &cfg);
            assert_eq!(sim.restart_countdown(), expected);
            assert_eq!(sim.ball().x, CENTER_COLUMN);
            assert_eq!(frame.ball, None);
        }
    }

    #[test]
    fn serve_launches_from_center_with_unit_speeds() {
        for seed in 0..64 {
            let mut sim = Simulation::seeded(seed);
            sim.restart_countdown = 1;
            sim.serve();

            assert_eq!(sim.restart_countdown(), 0);
            assert_eq!(sim.ball().x, CENTER_COLUMN);
            assert!(SERVE_ROWS.contains(&sim.ball().row()), "seed {seed}");
            assert!(sim.ball().vel_x == 1 || sim.ball().vel_x == -1);
            assert!(sim.ball().vel_y == 0.5 || sim.ball().vel_y == -0.5);
        }
    }

    #[test]
    fn serve_picks_both_directions() {
        let directions: std::collections::HashSet<(i32, bool)> = (0..64)
            .map(|seed| {
                let mut sim = Simulation::seeded(seed);
                sim.restart_countdown = 1;
                sim.serve();
                (sim.ball().vel_x, sim.ball().vel_y > 0.0)
            })
            .collect();
        assert_eq!(directions.len(), 4);
    }

    #[test]
    fn serve_clears_miss_flags_and_hold() {
        let mut sim = Simulation::seeded(3);
        sim.paddles[0].miss = true;
        sim.paddles[1].miss = true;
        sim.hold_display = true;
        sim.serve();
        assert!(!sim.paddle(Side::Left).miss);
        assert!(!sim.paddle(Side::Right).miss);
        assert!(!sim.hold_display());
    }

    #[test]
    fn ball_leaving_the_arena_restarts_the_countdown() {
        let mut sim = live_sim(Ball {
            x: 31,
            y: 8.0,
            vel_x: 1,
            vel_y: 0.0,
        });
        sim.hold_display = true;
        sim.tick(hms(10, 30, 20), &config());
        assert_eq!(sim.restart_countdown(), RESTART_TICKS);
        assert!(!sim.hold_display());
    }

    #[test]
    fn countdown_is_monotonic_and_resets_to_exactly_restart_ticks() {
        let mut sim = Simulation::seeded(11);
        let mut previous = sim.restart_countdown();
        let mut points = 0;
        run(&mut sim, hms(8, 0, 5), 20_000, |sim, _| {
            let now = sim.restart_countdown();
            if now > previous || (previous == 0 && now != 0) {
                assert_eq!(now, RESTART_TICKS);
                assert!(!sim.ball().in_arena());
                points += 1;
            } else if previous > 0 {
                assert_eq!(now, previous - 1);
            }
            previous = now;
        });
        assert!(points > 0, "no point was ever scored");
    }

    // ── Invariants over long runs ──────────────────────────────────

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(99)]
    fn ball_and_paddles_stay_in_bounds(#[case] seed: u64) {
        let mut sim = Simulation::seeded(seed);
        let mut last = [sim.paddle(Side::Left).y, sim.paddle(Side::Right).y];
        run(&mut sim, hms(23, 58, 0), 10_000, |sim, frame| {
            assert!((0.0..=MAX_ROW).contains(&sim.ball().y));
            assert!(sim.ball().vel_y.abs() <= MAX_SPEED_Y);
            for side in Side::BOTH {
                let paddle = sim.paddle(side);
                assert!((0..=PADDLE_MAX_ROW).contains(&paddle.y));
                assert!((0..=PADDLE_MAX_ROW).contains(&paddle.target_y));
                assert!((paddle.y - last[side.index()]).abs() <= 1);
            }
            last = frame.paddles;
            if let Some((_, row)) = frame.ball {
                assert!((0..ARENA_HEIGHT).contains(&row));
            }
        });
    }

    #[test]
    fn ball_reflects_off_the_walls() {
        let mut ball = Ball {
            x: 10,
            y: 0.3,
            vel_x: 1,
            vel_y: -0.5,
        };
        ball.advance();
        assert_eq!(ball.y, 0.0);
        assert_eq!(ball.vel_y, 0.5);

        ball.y = 14.8;
        ball.advance();
        assert_eq!(ball.y, MAX_ROW);
        assert_eq!(ball.vel_y, -0.5);
    }

    #[test]
    fn live_ball_is_drawn_rounded() {
        let mut sim = live_sim(Ball {
            x: 10,
            y: 6.0,
            vel_x: 1,
            vel_y: 0.5,
        });
        let frame = sim.tick(hms(10, 30, 20), &config());
        assert_eq!(frame.ball, Some((11, 7)));
    }

    // ── Clock boundaries ───────────────────────────────────────────

    fn neutral_ball() -> Ball {
        Ball {
            x: 10,
            y: 8.0,
            vel_x: 1,
            vel_y: 0.0,
        }
    }

    #[test]
    fn minute_boundary_sets_left_miss_only() {
        let mut sim = live_sim(neutral_ball());
        sim.tick(hms(10, 31, 0), &config());
        assert!(sim.paddle(Side::Left).miss);
        assert!(!sim.paddle(Side::Right).miss);
    }

    #[test]
    fn hour_boundary_sets_right_miss_and_leaves_left_alone() {
        let mut sim = live_sim(neutral_ball());
        sim.paddles[0].miss = true;
        sim.tick(hms(11, 0, 0), &config());
        assert!(sim.paddle(Side::Right).miss);
        assert!(sim.paddle(Side::Left).miss);
    }

    #[test]
    fn second_59_freezes_the_digits() {
        let mut sim = live_sim(neutral_ball());
        let cfg = config();
        sim.tick(hms(10, 31, 59), &cfg);
        assert!(sim.hold_display());

        let frame = sim.tick(hms(10, 32, 0), &cfg);
        assert_eq!(sim.displayed_time(), "10:31:59");
        assert_eq!(frame.digits, ['1', '0', '3', '1']);
    }

    #[test]
    fn hour_rollover_plays_out_against_the_held_time() {
        let mut sim = live_sim(neutral_ball());
        let cfg = config();

        sim.tick(hms(3, 59, 58), &cfg);
        assert!(!sim.hold_display());

        sim.tick(hms(3, 59, 59), &cfg);
        assert!(sim.hold_display());

        sim.tick(hms(4, 0, 0), &cfg);
        assert!(sim.paddle(Side::Right).miss);
        assert!(sim.hold_display());
        assert_eq!(sim.displayed_time(), "03:59:59");

        // Finish the point: hold clears and the new hour shows.
        sim.ball = Ball {
            x: 31,
            y: 8.0,
            vel_x: 1,
            vel_y: 0.0,
        };
        sim.tick(hms(4, 0, 0), &cfg);
        assert!(!sim.hold_display());
        let frame = sim.tick(hms(4, 0, 1), &cfg);
        assert_eq!(frame.digits, ['0', '4', '0', '0']);
    }

    #[test]
    fn flagged_paddle_misses_and_the_ball_exits_on_its_side() {
        for seed in 0..16 {
            let mut sim = Simulation::seeded(seed);
            sim.restart_countdown = 0;
            sim.ball = Ball {
                x: CENTER_COLUMN,
                y: 8.0,
                vel_x: -1,
                vel_y: 0.5,
            };
            sim.paddles[0].miss = true;

            let cfg = config();
            let mut exit = None;
            for _ in 0..40 {
                sim.tick(hms(10, 31, 30), &cfg);
                if sim.restart_countdown() == RESTART_TICKS {
                    exit = Some(sim.ball().x);
                    break;
                }
            }
            assert!(matches!(exit, Some(x) if x < 0), "seed {seed}: {exit:?}");
        }
    }

    #[test]
    fn unflagged_paddle_returns_the_ball() {
        for seed in 0..16 {
            let mut sim = Simulation::seeded(seed);
            sim.restart_countdown = 0;
            sim.ball = Ball {
                x: CENTER_COLUMN,
                y: 8.0,
                vel_x: -1,
                vel_y: 0.5,
            };

            let cfg = config();
            for _ in 0..16 {
                sim.tick(hms(10, 31, 30), &cfg);
            }
            assert!(sim.ball().vel_x > 0, "seed {seed}");
            assert_eq!(sim.restart_countdown(), 0);
        }
    }

    // ── Paddle contact ─────────────────────────────────────────────

    #[test]
    fn contact_always_reverses_the_ball() {
        for seed in 0..32 {
            let mut sim = live_sim(Ball {
                x: 4,
                y: 7.0,
                vel_x: -1,
                vel_y: 0.0,
            });
            sim.rng = StdRng::seed_from_u64(seed);
            sim.paddles[0] = Paddle {
                y: 5,
                target_y: 5,
                miss: false,
            };
            sim.tick(hms(10, 31, 30), &config());
            assert_eq!(sim.ball().vel_x, 1);
        }
    }

    #[test]
    fn paddle_near_top_flicks_downward() {
        let mut flicked = false;
        for seed in 0..32 {
            let mut sim = live_sim(Ball {
                x: 3,
                y: 2.0,
                vel_x: -1,
                vel_y: 0.5,
            });
            sim.rng = StdRng::seed_from_u64(seed);
            sim.paddles[0] = Paddle {
                y: 0,
                target_y: 0,
                miss: false,
            };
            sim.resolve_contact(Side::Left);
            let paddle = sim.paddle(Side::Left);
            if paddle.target_y > 0 {
                flicked = true;
                assert!((0.6..0.8).contains(&sim.ball().vel_y));
            } else {
                assert_eq!(sim.ball().vel_y, 0.5);
            }
        }
        assert!(flicked);
    }

    #[test]
    fn right_paddle_flick_moves_its_target_at_most_one_row() {
        let mut shifts = std::collections::HashSet::new();
        for seed in 0..64 {
            let mut sim = live_sim(Ball {
                x: 28,
                y: 7.0,
                vel_x: 1,
                vel_y: 0.5,
            });
            sim.rng = StdRng::seed_from_u64(seed);
            sim.paddles[1] = Paddle {
                y: 5,
                target_y: 5,
                miss: false,
            };
            sim.resolve_contact(Side::Right);
            shifts.insert((sim.paddle(Side::Right).target_y - 5).abs());
        }
        assert!(shifts.iter().all(|s| *s <= 1), "{shifts:?}");
        assert!(shifts.contains(&1));
    }

    #[test]
    fn restart_point_drops_a_stale_hold_and_miss() {
        let mut sim = live_sim(neutral_ball());
        let cfg = config();
        sim.tick(hms(10, 31, 59), &cfg);
        sim.tick(hms(10, 32, 0), &cfg);
        assert!(sim.hold_display());
        assert!(sim.paddle(Side::Left).miss);
        let ticks = sim.ticks();

        sim.restart_point();
        assert!(!sim.hold_display());
        assert!(!sim.paddle(Side::Left).miss);
        assert_eq!(sim.restart_countdown(), RESTART_TICKS);
        assert_eq!(sim.ball().x, CENTER_COLUMN);
        assert_eq!(sim.ticks(), ticks);

        sim.tick(hms(11, 45, 10), &cfg);
        assert_eq!(sim.displayed_time(), "11:45:10");
    }

    #[test]
    fn flick_keeps_vertical_speed_in_range() {
        let mut ball = Ball {
            x: 3,
            y: 5.0,
            vel_x: 1,
            vel_y: 1.9,
        };
        ball.nudge_vel_y(FLICK_STEP);
        assert_eq!(ball.vel_y, MAX_SPEED_Y);

        ball.vel_y = -0.1;
        ball.nudge_vel_y(FLICK_STEP);
        assert_eq!(ball.vel_y, MIN_SPEED_Y);

        ball.vel_y = 0.3;
        ball.nudge_vel_y(-FLICK_STEP);
        assert_eq!(ball.vel_y, MIN_SPEED_Y);
    }

    #[test]
    fn frames_carry_the_resolved_palette() {
        let mut sim = Simulation::seeded(5);
        let cfg = config();
        let frame = sim.tick(hms(1, 2, 3), &cfg);
        assert_eq!(frame.palette, Palette::resolve(cfg.color, cfg.dim));
        assert_eq!(frame.digits, ['0', '1', '0', '2']);
    }
}
