use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Boule {0} hors limites (1-50)")]
    BallOutOfRange(u8),
    #[error("Étoile {0} hors limites (1-12)")]
    StarOutOfRange(u8),
    #[error("Boule en double : {0}")]
    DuplicateBall(u8),
    #[error("Étoile en double : {0}")]
    DuplicateStar(u8),
}

/// Un tirage historique. Immuable une fois enregistré.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draw {
    pub draw_date: NaiveDate,
    pub draw_number: Option<u32>,
    pub balls: [u8; 5],
    pub stars: [u8; 2],
    pub jackpot: Option<f64>,
}

impl Draw {
    pub fn new(draw_date: NaiveDate, balls: [u8; 5], stars: [u8; 2]) -> Result<Self, ValidationError> {
        validate_draw(&balls, &stars)?;
        Ok(Self {
            draw_date,
            draw_number: None,
            balls,
            stars,
            jackpot: None,
        })
    }

    pub fn with_jackpot(mut self, jackpot: Option<f64>) -> Self {
        self.jackpot = jackpot;
        self
    }

    pub fn with_draw_number(mut self, draw_number: Option<u32>) -> Self {
        self.draw_number = draw_number;
        self
    }

    pub fn sorted_balls(&self) -> [u8; 5] {
        let mut balls = self.balls;
        balls.sort();
        balls
    }

    pub fn sorted_stars(&self) -> [u8; 2] {
        let mut stars = self.stars;
        stars.sort();
        stars
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    Balls,
    Stars,
}

impl Pool {
    pub fn size(&self) -> usize {
        match self {
            Pool::Balls => 50,
            Pool::Stars => 12,
        }
    }

    pub fn pick_count(&self) -> usize {
        match self {
            Pool::Balls => 5,
            Pool::Stars => 2,
        }
    }

    pub fn numbers_from<'a>(&self, draw: &'a Draw) -> &'a [u8] {
        match self {
            Pool::Balls => &draw.balls,
            Pool::Stars => &draw.stars,
        }
    }

    pub fn contains(&self, number: u8) -> bool {
        number >= 1 && number as usize <= self.size()
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pool::Balls => write!(f, "boules"),
            Pool::Stars => write!(f, "étoiles"),
        }
    }
}

pub fn validate_draw(balls: &[u8; 5], stars: &[u8; 2]) -> Result<(), ValidationError> {
    for &b in balls {
        if !Pool::Balls.contains(b) {
            return Err(ValidationError::BallOutOfRange(b));
        }
    }
    for &s in stars {
        if !Pool::Stars.contains(s) {
            return Err(ValidationError::StarOutOfRange(s));
        }
    }
    for i in 0..balls.len() {
        for j in (i + 1)..balls.len() {
            if balls[i] == balls[j] {
                return Err(ValidationError::DuplicateBall(balls[i]));
            }
        }
    }
    if stars[0] == stars[1] {
        return Err(ValidationError::DuplicateStar(stars[0]));
    }
    Ok(())
}
