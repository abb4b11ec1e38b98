//! Example: follow-up references over a stored result list
//!
//! Parses a few utterances and resolves "открой второй"-style references
//! against a dialogue context, without touching files or the browser.

use winagent_intent::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Follow-up Reference Example ===\n");

    let engine = IntentEngine::new(AgentConfig::default());
    let mut context = DialogueContext::default();

    // what a file search would have stored
    context.set_results(
        vec![
            r"C:\Users\user\Documents\отчёт_март.docx".to_string(),
            r"C:\Users\user\Documents\отчёт_апрель.docx".to_string(),
            r"C:\Users\user\Desktop\отчёт.txt".to_string(),
        ],
        ResultKind::File,
    );

    let utterances = [
        "найди файл отчёт",
        "открой его",
        "открой второй",
        "открой 3",
        "открой последний",
        "открой 7",
        "сбрось контекст",
        "открой первый",
    ];

    for text in utterances {
        println!("Input: \"{}\"", text);
        let result = engine.parse(text);
        println!("  Intent: {}", result.intent.command.tag());
        println!("  Confidence: {:.2}", result.intent.confidence);

        match result.intent.command {
            Command::ContextReference { reference } => match context.resolve(&reference) {
                Ok((target, kind)) => println!("  -> {} ({})", target, kind),
                Err(e) => println!("  -> {}", e),
            },
            Command::ResetContext => {
                context.clear();
                println!("  -> context cleared");
            }
            _ => {}
        }
        println!();
    }

    Ok(())
}
