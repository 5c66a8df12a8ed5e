use lms_core::model::{Context, Course, EntryId, Reference};
use services::AppServices;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;

use args::{Args, Command, print_usage};

fn print_course(course: &Course) {
    let paths = if course.course_paths.is_empty() {
        String::new()
    } else {
        format!(" [{}]", course.course_paths.join(", "))
    };
    println!(
        "{}  {}  {}h/m, {} sections, {} lessons{paths}",
        course.id,
        course.name,
        course.duration,
        course.sections.len(),
        course.count_lessons(),
    );
}

async fn show_course(
    services: &AppServices,
    ctx: &Context,
    id: &EntryId,
) -> Result<(), Box<dyn std::error::Error>> {
    let course = services.catalog().course(ctx, id).await?;
    let progress = services.aggregator().course_progress(ctx, &course).await?;
    let percent_of = |id: &EntryId, list: &[services::ProgressUpdate]| {
        list.iter()
            .find(|p| &p.entry_id == id)
            .map(|p| p.percent)
            .unwrap_or_default()
    };

    print_course(&course);
    println!("  progress {}", progress.course.percent);
    for section in &course.sections {
        println!(
            "  {}  {}  {}",
            section.id,
            section.name,
            percent_of(&section.id, &progress.sections)
        );
        for lesson in &section.lessons {
            let name = match lesson {
                Reference::Expanded(l) => l.name.as_str(),
                Reference::Stub(stub) => stub.name.as_deref().unwrap_or("?"),
            };
            println!(
                "    {}  {}  {}",
                lesson.id(),
                name,
                percent_of(lesson.id(), &progress.lessons)
            );
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = args.context();
    let services = AppServices::new_sqlite(&args.db_url).await?;
    tracing::debug!(project = %ctx.project(), user = %ctx.user(), "services ready");

    match &args.command {
        Command::Courses => {
            for course in services.catalog().courses(&ctx).await? {
                print_course(&course);
            }
        }
        Command::Course(id) => show_course(&services, &ctx, id).await?,
        Command::Paths => {
            for path in services.catalog().learning_paths(&ctx).await? {
                println!(
                    "{}  {}  {}h, {} courses, {} lessons",
                    path.id, path.name, path.duration_hours, path.count_courses, path.count_lessons
                );
                for course in &path.courses {
                    println!("  {}  {}", course.id, course.name);
                }
            }
        }
        Command::Progress(ids) => {
            let stored = services.progress().get_all_progress(&ctx, ids).await?;
            for id in ids {
                println!("{id}  {}", stored.get(id).copied().unwrap_or_default());
            }
        }
        Command::CompleteLesson { lesson, percent } => {
            let rolled = services
                .aggregator()
                .update_lesson_progress(&ctx, lesson, *percent)
                .await?;
            println!("lesson  {}  {}", rolled.lesson.entry_id, rolled.lesson.percent);
            println!("section {}  {}", rolled.section.entry_id, rolled.section.percent);
            println!("course  {}  {}", rolled.course.entry_id, rolled.course.percent);
        }
        Command::ScorePages(scores) => {
            let ids: Vec<EntryId> = scores.keys().cloned().collect();
            services
                .aggregator()
                .update_pages_progress(&ctx, &ids, scores)
                .await?;
            println!("stored {} page scores", ids.len());
        }
        Command::DeleteCourse(id) => {
            let course = services.catalog().course(&ctx, id).await?;
            services.deletion().delete_course(&ctx, &course).await?;
            println!("deleted course {id}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lms=info,services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return;
    }

    let args = match Args::parse(raw) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(err) = run(args).await {
        tracing::error!(error = %err, "command failed");
        std::process::exit(1);
    }
}
