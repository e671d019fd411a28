//! The `mocktest take` command: an interactive session driven from stdin.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use exam_core::model::TestId;
use services::{
    JumpOutcome, ResumeChoice, SessionController, SessionError, SessionPhase, SubmitStatus,
};

use crate::input::{HELP, Input, parse_line};
use crate::render;

pub async fn execute(controller: &mut SessionController, id: TestId) -> Result<()> {
    controller.select_test(id);
    println!("Loading {id}...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    controller.leave_session();
                    break;
                };
                match apply(controller, &line).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(err) => println!("! {err}"),
                }
            }
            Some(event) = controller.next_event() => {
                if let Some(notice) = controller.handle_event(event).await {
                    render::notice(controller, &notice);
                }
            }
        }
        if controller.phase() == SessionPhase::Catalog && controller.detail().is_none() {
            break;
        }
    }
    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

async fn apply(controller: &mut SessionController, line: &str) -> Result<Flow, SessionError> {
    let Some(input) = parse_line(line) else {
        println!("? unknown command, type `help`");
        return Ok(Flow::Continue);
    };

    match (controller.phase(), input) {
        (_, Input::Help) => println!("{HELP}"),
        (SessionPhase::Results, Input::Quit) => {
            controller.leave_session();
            return Ok(Flow::Quit);
        }
        (_, Input::Quit) => {
            controller.leave_session();
            println!("Progress saved; run `take` again to resume.");
            return Ok(Flow::Quit);
        }
        (_, Input::Reset) => {
            controller.reset().await;
            println!("Session discarded.");
            return Ok(Flow::Quit);
        }

        (SessionPhase::ResumePrompt, Input::Yes) => {
            let notice = controller.resolve_resume(ResumeChoice::Resume).await?;
            render::notice(controller, &notice);
        }
        (SessionPhase::ResumePrompt, Input::No) => {
            let notice = controller.resolve_resume(ResumeChoice::Discard).await?;
            render::notice(controller, &notice);
        }
        (SessionPhase::ConfirmSubmit, Input::Yes) => {
            let status = controller.confirm_submit(true).await?;
            report(controller, &status);
        }
        (SessionPhase::ConfirmSubmit, Input::No) => {
            controller.confirm_submit(false).await?;
            render::question(controller);
        }
        (SessionPhase::Results, Input::Retry) => {
            let outcome = controller.retry_submit().await?;
            render::outcome(&outcome);
        }

        (_, Input::Key(event)) => {
            if controller.handle_key(&event).await?.is_some() {
                render::question(controller);
            }
        }
        (_, Input::Note(text)) => {
            if let Some(id) = controller.current_question().map(|q| q.id) {
                controller.set_note(id, text).await?;
                render::question(controller);
            }
        }
        (_, Input::Filter(filter)) => {
            controller.set_filter(filter)?;
            render::palette(controller);
        }
        (_, Input::Jump(number)) => {
            controller.jump_to(number - 1).await?;
            render::question(controller);
        }
        (_, Input::FirstUnanswered) => match controller.jump_to_first_unanswered().await? {
            JumpOutcome::Moved(_) => render::question(controller),
            JumpOutcome::AllAnswered => println!("All questions are answered."),
        },
        (_, Input::AutoAdvance(enabled)) => {
            controller.set_auto_advance(enabled).await?;
            println!("auto-advance {}", if enabled { "on" } else { "off" });
        }
        (_, Input::Pause) => {
            controller.pause().await?;
            println!("Paused. Type `resume` to continue.");
        }
        (_, Input::Resume) => {
            controller.resume()?;
            render::question(controller);
        }
        (_, Input::Submit) => {
            let status = controller.submit(false).await?;
            report(controller, &status);
        }
        (_, Input::Palette) => render::palette(controller),
        (_, Input::Show) => render::question(controller),
        (phase, Input::Yes | Input::No | Input::Retry) => {
            println!("? nothing to answer while {phase}");
        }
    }
    Ok(Flow::Continue)
}

fn report(controller: &SessionController, status: &SubmitStatus) {
    match status {
        SubmitStatus::NeedsConfirmation { unanswered } => {
            println!("{unanswered} question(s) unanswered. Submit anyway? [y/no]");
        }
        SubmitStatus::Submitted(outcome) => render::outcome(outcome),
        SubmitStatus::AlreadySubmitted => println!("Already submitted."),
        SubmitStatus::Cancelled => render::question(controller),
    }
}
