use exam_core::time::format_countdown;
use services::{SessionController, SessionNotice, SessionPhase, SubmissionOutcome};

pub fn question(controller: &SessionController) {
    let (Some(progress), Some(question), Some(state)) = (
        controller.progress(),
        controller.current_question(),
        controller.state(),
    ) else {
        return;
    };

    let mut markers = Vec::new();
    if state.is_flagged(question.id) {
        markers.push("flagged");
    }
    if state.is_marked_for_review(question.id) {
        markers.push("review");
    }
    if progress.phase == SessionPhase::Paused {
        markers.push("PAUSED");
    }

    println!();
    println!(
        "Question {}/{}  [{}]  {} answered  {}",
        progress.current_index + 1,
        progress.total_questions,
        progress.countdown,
        progress.answered,
        markers.join(" ")
    );
    println!("{}", question.text);
    for (index, option) in question.options.iter().enumerate() {
        let selected = if state.answer(question.id) == Some(index) {
            '>'
        } else {
            ' '
        };
        if state.is_eliminated(question.id, index) {
            println!(" {selected} {}. ~{option}~", index + 1);
        } else {
            println!(" {selected} {}. {option}", index + 1);
        }
    }
    if let Some(note) = state.note(question.id) {
        println!("  note: {note}");
    }
}

pub fn palette(controller: &SessionController) {
    let (Some(progress), Some(detail), Some(state)) =
        (controller.progress(), controller.detail(), controller.state())
    else {
        return;
    };

    let cells: Vec<String> = progress
        .visible
        .iter()
        .filter_map(|&index| detail.question_at(index).map(|q| (index, q.id)))
        .map(|(index, id)| {
            let mut cell = (index + 1).to_string();
            if state.is_answered(id) {
                cell.push('*');
            }
            if state.is_flagged(id) {
                cell.push('!');
            }
            if state.is_marked_for_review(id) {
                cell.push('?');
            }
            if index == progress.current_index {
                cell = format!("[{cell}]");
            }
            cell
        })
        .collect();

    let counts = progress.counts;
    println!(
        "filter {}  | all {} answered {} unanswered {} flagged {} review {}",
        progress.filter,
        counts.all,
        counts.answered,
        counts.unanswered,
        counts.flagged,
        counts.review
    );
    if cells.is_empty() {
        println!("  (no questions match)");
    } else {
        println!("  {}", cells.join(" "));
    }
}

pub fn outcome(outcome: &SubmissionOutcome) {
    let result = &outcome.result;
    println!();
    println!(
        "Score {}%  ({} correct, {} incorrect, {} unanswered of {})  time {}",
        result.score,
        result.correct_answers,
        result.incorrect(),
        result.unanswered(),
        result.total_questions,
        format_countdown(result.time_taken_seconds)
    );
    for (index, entry) in result.breakdown.iter().enumerate() {
        let mark = if entry.is_correct { "ok " } else { "xx " };
        let answer = entry
            .user_answer
            .map_or_else(|| "-".to_string(), |a| (a + 1).to_string());
        println!(
            "{mark}{:>3}. {}  (yours {answer}, correct {})",
            index + 1,
            entry.question,
            entry.correct_answer + 1
        );
        if !entry.is_correct && !entry.explanation.is_empty() {
            println!("       {}", entry.explanation);
        }
        if let Some(note) = &entry.note {
            println!("       note: {note}");
        }
    }
    match &outcome.sync_warning {
        Some(warning) => {
            println!("! result not saved on the server: {warning}");
            println!("  type `retry` to send it again; the scored attempt is kept locally");
        }
        None => println!("Result saved."),
    }
}

pub fn notice(controller: &SessionController, notice: &SessionNotice) {
    match notice {
        SessionNotice::Started { resumed } => {
            if let Some(detail) = controller.detail() {
                let verb = if *resumed { "Resumed" } else { "Started" };
                println!(
                    "{verb} \"{}\": {} questions, {} minutes. Type `help` for keys.",
                    detail.summary.title,
                    detail.total_questions(),
                    detail.summary.duration
                );
            }
            question(controller);
        }
        SessionNotice::ResumeAvailable {
            answered,
            time_remaining_seconds,
            ..
        } => {
            println!(
                "A saved session exists ({answered} answered, {} left). Resume? [y/no]",
                format_countdown(*time_remaining_seconds)
            );
        }
        SessionNotice::SubmissionPending { .. } => {
            println!("This test was already finished but its result never reached the server.");
            if let Some(result) = controller.outcome() {
                outcome(result);
            }
        }
        SessionNotice::LoadFailed(reason) => println!("! could not load the test: {reason}"),
        SessionNotice::EmptyTest => println!("! this test has no questions"),
        SessionNotice::Ticked { remaining } => {
            if remaining % 60 == 0 || *remaining <= 10 {
                println!("  time left {}", format_countdown(*remaining));
            }
        }
        SessionNotice::Advanced { .. } => question(controller),
        SessionNotice::Submitted { timed_out } => {
            if *timed_out {
                println!("Time is up.");
            }
            if let Some(result) = controller.outcome() {
                outcome(result);
            }
        }
    }
}
