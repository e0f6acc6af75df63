use chrono::{Days, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub use entity::{
    attendance_records, confidence_level, detection_method, email_mappings, meet_participants,
    meet_sessions, meet_sync_status, meeting_status, meetings, users, Id,
};

pub mod attendance_record;
pub mod email_mapping;
pub mod error;
pub mod meet_participant;
pub mod meet_session;
pub mod meeting;
pub mod user;

/// Seeds a development database with a handful of members and meetings so
/// a sync pass has something to chew on. Meet codes here are made up; point
/// the gateway at a mock server when exercising the full pipeline locally.
pub async fn seed_database(db: &DatabaseConnection) {
    let now = Utc::now();

    let alice = users::ActiveModel {
        email: Set("alice@cadenceclub.org".to_owned()),
        first_name: Set(Some("Alice".to_owned())),
        last_name: Set(Some("Nguyen".to_owned())),
        display_name: Set(Some("Alice N".to_owned())),
        timezone: Set("America/Chicago".to_owned()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    let bob = users::ActiveModel {
        email: Set("bob@cadenceclub.org".to_owned()),
        first_name: Set(Some("Bob".to_owned())),
        last_name: Set(Some("Okafor".to_owned())),
        display_name: Set(Some("Bob O".to_owned())),
        timezone: Set("America/New_York".to_owned()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    let carol = users::ActiveModel {
        email: Set("carol@cadenceclub.org".to_owned()),
        first_name: Set(Some("Carol".to_owned())),
        last_name: Set(Some("Silva".to_owned())),
        display_name: Set(Some("Carol S".to_owned())),
        timezone: Set("America/Chicago".to_owned()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    // Carol sometimes joins from her personal account.
    email_mappings::ActiveModel {
        external_email: Set("carol.silva.home@gmail.com".to_owned()),
        user_id: Set(carol.id.clone().unwrap()),
        confidence_level: Set(confidence_level::ConfidenceLevel::High),
        note: Set(Some("Confirmed by Carol in Slack".to_owned())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    // Today's check-ins: one with a captured Meet link, one without.
    meetings::ActiveModel {
        user_id: Set(alice.id.clone().unwrap()),
        title: Set("Alice weekly check-in".to_owned()),
        scheduled_at: Set((now - Duration::hours(2)).into()),
        duration_minutes: Set(45),
        status: Set(meeting_status::MeetingStatus::Completed),
        meet_link: Set(Some("https://meet.google.com/abc-defg-hij".to_owned())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    meetings::ActiveModel {
        user_id: Set(bob.id.clone().unwrap()),
        title: Set("Bob accountability check-in".to_owned()),
        scheduled_at: Set((now - Duration::hours(1)).into()),
        duration_minutes: Set(30),
        status: Set(meeting_status::MeetingStatus::Completed),
        meet_link: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    meetings::ActiveModel {
        user_id: Set(carol.id.clone().unwrap()),
        title: Set("Carol goal review".to_owned()),
        scheduled_at: Set((now + Duration::hours(3)).into()),
        duration_minutes: Set(60),
        status: Set(meeting_status::MeetingStatus::Scheduled),
        meet_link: Set(Some("https://meet.google.com/kln-mnop-qrs".to_owned())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    // A canceled meeting the sync pass must skip.
    meetings::ActiveModel {
        user_id: Set(alice.id.clone().unwrap()),
        title: Set("Canceled strategy session".to_owned()),
        scheduled_at: Set((now - Duration::hours(4)).into()),
        duration_minutes: Set(30),
        status: Set(meeting_status::MeetingStatus::Canceled),
        meet_link: Set(Some("https://meet.google.com/tuv-wxyz-abc".to_owned())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();

    // Next week's session, outside any backfill window run today.
    meetings::ActiveModel {
        user_id: Set(bob.id.clone().unwrap()),
        title: Set("Bob accountability check-in".to_owned()),
        scheduled_at: Set((now.checked_add_days(Days::new(7)).unwrap()).into()),
        duration_minutes: Set(30),
        status: Set(meeting_status::MeetingStatus::Scheduled),
        meet_link: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .save(db)
    .await
    .unwrap();
}
