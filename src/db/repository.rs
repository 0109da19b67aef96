use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::course::{CourseRow, HoleRow, TeeRow};
use crate::models::round::{
    HoleScoreRow, RoundRow, hazards_from_text, hazards_to_text,
};
use crate::models::{
    Course, FairwayResult, Hole, HoleScore, Round, RoundTotals, RoundType, TeeColor, TeeOption,
};

fn decode_err(msg: impl Into<String>) -> sqlx::Error {
    let msg: String = msg.into();
    sqlx::Error::Decode(msg.into())
}

fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_err(format!("bad timestamp {ts:?}: {e}")))
}

fn to_u32(value: i64, column: &str) -> Result<u32, sqlx::Error> {
    u32::try_from(value).map_err(|_| decode_err(format!("{column} out of range: {value}")))
}

pub async fn insert_course(conn: &mut SqliteConnection, course: &Course) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO courses (id, name, location, par, total_yardage, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            location = excluded.location,
            par = excluded.par,
            total_yardage = excluded.total_yardage,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&course.id)
    .bind(&course.name)
    .bind(&course.location)
    .bind(course.par)
    .bind(course.total_yardage)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM holes WHERE course_id = ?")
        .bind(&course.id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM tee_options WHERE course_id = ?")
        .bind(&course.id)
        .execute(&mut *conn)
        .await?;

    for hole in &course.holes {
        sqlx::query(
            "INSERT INTO holes (course_id, number, par, yardage, handicap) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&course.id)
        .bind(i64::from(hole.number))
        .bind(hole.par)
        .bind(hole.yardage)
        .bind(i64::from(hole.handicap))
        .execute(&mut *conn)
        .await?;
    }

    for tee in &course.tees {
        let yardages = serde_json::to_string(&tee.yardages)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            "INSERT INTO tee_options (course_id, name, color, yardages) VALUES (?, ?, ?, ?)",
        )
        .bind(&course.id)
        .bind(&tee.name)
        .bind(tee.color.as_str())
        .bind(yardages)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn load_course(db: &SqlitePool, row: CourseRow) -> Result<Course, sqlx::Error> {
    let holes = sqlx::query_as::<_, HoleRow>(
        "SELECT course_id, number, par, yardage, handicap FROM holes WHERE course_id = ? ORDER BY number",
    )
    .bind(&row.id)
    .fetch_all(db)
    .await?;

    let tees = sqlx::query_as::<_, TeeRow>(
        "SELECT course_id, name, color, yardages FROM tee_options WHERE course_id = ? ORDER BY name",
    )
    .bind(&row.id)
    .fetch_all(db)
    .await?;

    let holes = holes
        .into_iter()
        .map(|h| {
            Ok(Hole {
                number: to_u32(h.number, "holes.number")?,
                par: h.par as i32,
                yardage: h.yardage as i32,
                handicap: to_u32(h.handicap, "holes.handicap")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let tees = tees
        .into_iter()
        .map(|t| {
            let color = TeeColor::from_str(&t.color).map_err(decode_err)?;
            let yardages: Vec<i32> = serde_json::from_str(&t.yardages)
                .map_err(|e| decode_err(format!("bad yardages for tee {}: {e}", t.name)))?;
            Ok(TeeOption {
                name: t.name,
                color,
                yardages,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(Course {
        id: row.id,
        name: row.name,
        location: row.location,
        par: row.par as i32,
        total_yardage: row.total_yardage.map(|y| y as i32),
        holes,
        tees,
    })
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CourseRow>(
        "SELECT id, name, location, par, total_yardage, updated_at FROM courses ORDER BY name",
    )
    .fetch_all(db)
    .await?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in rows {
        courses.push(load_course(db, row).await?);
    }
    Ok(courses)
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    let row = sqlx::query_as::<_, CourseRow>(
        "SELECT id, name, location, par, total_yardage, updated_at FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    match row {
        Some(row) => Ok(Some(load_course(db, row).await?)),
        None => Ok(None),
    }
}

pub async fn insert_round(conn: &mut SqliteConnection, round: &Round) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO rounds
            (id, course_id, started_at, starting_hole, total_holes, round_type,
            is_complete, total_strokes, total_putts, greens_in_regulation, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&round.id)
    .bind(&round.course_id)
    .bind(round.started_at.to_rfc3339())
    .bind(i64::from(round.starting_hole))
    .bind(i64::from(round.total_holes))
    .bind(round.round_type.as_str())
    .bind(round.is_complete)
    .bind(i64::from(round.totals.total_strokes))
    .bind(i64::from(round.totals.total_putts))
    .bind(i64::from(round.totals.greens_in_regulation))
    .bind(round.completed_at.map(|t| t.to_rfc3339()))
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts or replaces the score for `(round_id, score.hole_number)`.
pub async fn upsert_hole_score(
    conn: &mut SqliteConnection,
    round_id: &str,
    score: &HoleScore,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO hole_scores
            (round_id, hole_number, strokes, putts, green_in_regulation, fairway, hazards)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(round_id, hole_number) DO UPDATE SET
            strokes = excluded.strokes,
            putts = excluded.putts,
            green_in_regulation = excluded.green_in_regulation,
            fairway = excluded.fairway,
            hazards = excluded.hazards
        "#,
    )
    .bind(round_id)
    .bind(i64::from(score.hole_number))
    .bind(i64::from(score.strokes))
    .bind(i64::from(score.putts))
    .bind(score.green_in_regulation)
    .bind(score.fairway.map(|f| f.as_str()))
    .bind(hazards_to_text(&score.hazards))
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn complete_round(
    conn: &mut SqliteConnection,
    round_id: &str,
    totals: &RoundTotals,
    completed_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE rounds
        SET is_complete = 1,
            total_strokes = ?2,
            total_putts = ?3,
            greens_in_regulation = ?4,
            completed_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(round_id)
    .bind(i64::from(totals.total_strokes))
    .bind(i64::from(totals.total_putts))
    .bind(i64::from(totals.greens_in_regulation))
    .bind(completed_at.to_rfc3339())
    .execute(conn)
    .await?
    .rows_affected();

    Ok(result > 0)
}

fn hole_score_from_row(row: HoleScoreRow) -> Result<HoleScore, sqlx::Error> {
    let fairway = row
        .fairway
        .as_deref()
        .map(FairwayResult::from_str)
        .transpose()
        .map_err(decode_err)?;

    Ok(HoleScore {
        hole_number: to_u32(row.hole_number, "hole_scores.hole_number")?,
        strokes: to_u32(row.strokes, "hole_scores.strokes")?,
        putts: to_u32(row.putts, "hole_scores.putts")?,
        green_in_regulation: row.green_in_regulation,
        fairway,
        hazards: hazards_from_text(&row.hazards).map_err(decode_err)?,
    })
}

async fn load_round(db: &SqlitePool, row: RoundRow) -> Result<Round, sqlx::Error> {
    let scores = sqlx::query_as::<_, HoleScoreRow>(
        r#"
        SELECT round_id, hole_number, strokes, putts, green_in_regulation, fairway, hazards
        FROM hole_scores
        WHERE round_id = ?
        ORDER BY hole_number
        "#,
    )
    .bind(&row.id)
    .fetch_all(db)
    .await?;

    let hole_scores = scores
        .into_iter()
        .map(hole_score_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Round {
        course_id: row.course_id,
        started_at: parse_timestamp(&row.started_at)?,
        starting_hole: to_u32(row.starting_hole, "rounds.starting_hole")?,
        total_holes: to_u32(row.total_holes, "rounds.total_holes")?,
        round_type: RoundType::from_str(&row.round_type).map_err(decode_err)?,
        is_complete: row.is_complete,
        totals: RoundTotals {
            total_strokes: to_u32(row.total_strokes, "rounds.total_strokes")?,
            total_putts: to_u32(row.total_putts, "rounds.total_putts")?,
            greens_in_regulation: to_u32(row.greens_in_regulation, "rounds.greens_in_regulation")?,
        },
        completed_at: row.completed_at.as_deref().map(parse_timestamp).transpose()?,
        hole_scores,
        id: row.id,
    })
}

pub async fn find_round_by_id(db: &SqlitePool, id: &str) -> Result<Option<Round>, sqlx::Error> {
    let row = sqlx::query_as::<_, RoundRow>(
        r#"
        SELECT id, course_id, started_at, starting_hole, total_holes, round_type,
            is_complete, total_strokes, total_putts, greens_in_regulation, completed_at
        FROM rounds
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    match row {
        Some(row) => Ok(Some(load_round(db, row).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_rounds(db: &SqlitePool) -> Result<Vec<Round>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RoundRow>(
        r#"
        SELECT id, course_id, started_at, starting_hole, total_holes, round_type,
            is_complete, total_strokes, total_putts, greens_in_regulation, completed_at
        FROM rounds
        ORDER BY started_at DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    let mut rounds = Vec::with_capacity(rows.len());
    for row in rows {
        rounds.push(load_round(db, row).await?);
    }
    Ok(rounds)
}
