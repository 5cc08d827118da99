//! Tests for the multi-file patch loop.

mod common;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use common::{ScriptedGenerator, ScriptedSandbox, ScriptedTerminal};
use sandycode::project::ProjectWalker;
use sandycode::workflow::{ModifyOutcome, ModifyWorkflow};
use sandycode::Error;

const ORIGINAL_JS: &str = "const data = JSON.parse(input);\nconsole.log(data);\n";

fn project_with_file_js() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("file.js"), ORIGINAL_JS).unwrap();
    dir
}

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

#[tokio::test]
async fn failing_round_then_clean_round_writes_once() {
    let project = project_with_file_js();
    let first = "--- File: file.js ---\ntry { JSON.parse(input) } catch (e) {\n";
    let second = "--- File: file.js ---\ntry {\n  console.log(JSON.parse('{}'));\n} catch (e) {\n  console.error(e);\n}\n";
    let generator = ScriptedGenerator::new().respond(first).respond(second);
    let sandbox = ScriptedSandbox::new()
        .fail("SyntaxError: Unexpected end of input")
        .succeed();
    let mut terminal = ScriptedTerminal::new(&["add error handling to file.js"]);

    let outcome = ModifyWorkflow::new(
        generator.clone(),
        sandbox.clone(),
        ProjectWalker::new(project.path()),
    )
    .run(&mut terminal)
    .await
    .unwrap();

    assert_eq!(
        outcome,
        ModifyOutcome::Applied {
            files: vec![PathBuf::from("file.js")],
            attempts: 2,
        }
    );
    assert_eq!(
        read(project.path(), "file.js"),
        "try {\n  console.log(JSON.parse('{}'));\n} catch (e) {\n  console.error(e);\n}"
    );

    let executions = sandbox.executions();
    assert_eq!(executions.len(), 2);
    assert!(executions.iter().all(|e| e.path == PathBuf::from("file.js")));

    let requests = generator.requests();
    assert!(requests[0]
        .instruction
        .contains("based on this request: add error handling to file.js"));
    assert!(requests[0]
        .instruction
        .contains(&format!("--- File: file.js ---\n{}", ORIGINAL_JS)));
    assert!(requests[1]
        .instruction
        .contains("SyntaxError: Unexpected end of input"));
}

#[tokio::test]
async fn failed_rounds_leave_project_untouched() {
    let project = project_with_file_js();
    std::fs::write(project.path().join("util.py"), "x = 1\n").unwrap();

    let response = "--- File: file.js ---\nconsole.log(1);\n\
                    --- File: util.py ---\nraise SystemExit(1)\n\
                    --- File: run.sh ---\necho never\n";
    let mut generator = ScriptedGenerator::new();
    let mut sandbox = ScriptedSandbox::new();
    for _ in 0..5 {
        generator = generator.respond(response);
        sandbox = sandbox.succeed().fail("SystemExit: 1");
    }
    let mut terminal = ScriptedTerminal::new(&["rework everything"]);

    let outcome = ModifyWorkflow::new(
        generator.clone(),
        sandbox.clone(),
        ProjectWalker::new(project.path()),
    )
    .run(&mut terminal)
    .await
    .unwrap();

    assert_eq!(outcome, ModifyOutcome::Aborted { attempts: 5 });
    assert_eq!(read(project.path(), "file.js"), ORIGINAL_JS);
    assert_eq!(read(project.path(), "util.py"), "x = 1\n");
    assert!(!project.path().join("run.sh").exists());

    // The third patch of each round is never run.
    let executions = sandbox.executions();
    assert_eq!(executions.len(), 10);
    assert!(executions.iter().all(|e| e.path != PathBuf::from("run.sh")));
    assert_eq!(generator.call_count(), 5);
}

#[tokio::test]
async fn empty_response_means_no_changes() {
    let project = project_with_file_js();
    let generator = ScriptedGenerator::new().respond("\n");
    let sandbox = ScriptedSandbox::new();
    let mut terminal = ScriptedTerminal::new(&["nothing to do"]);

    let outcome = ModifyWorkflow::new(generator, sandbox.clone(), ProjectWalker::new(project.path()))
        .run(&mut terminal)
        .await
        .unwrap();

    assert_eq!(outcome, ModifyOutcome::NoChangesProposed { attempts: 1 });
    assert!(sandbox.executions().is_empty());
    assert_eq!(read(project.path(), "file.js"), ORIGINAL_JS);
}

#[tokio::test]
async fn malformed_response_consumes_an_attempt() {
    let project = project_with_file_js();
    let generator = ScriptedGenerator::new()
        .respond("Sure! I added error handling to your file.")
        .respond("--- File: file.js ---\nconsole.log('ok');\n");
    let sandbox = ScriptedSandbox::new().succeed();
    let mut terminal = ScriptedTerminal::new(&["add logging"]);

    let outcome = ModifyWorkflow::new(generator, sandbox, ProjectWalker::new(project.path()))
        .run(&mut terminal)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ModifyOutcome::Applied {
            files: vec![PathBuf::from("file.js")],
            attempts: 2,
        }
    );
    assert!(terminal.said("malformed patch response"));
    assert_eq!(read(project.path(), "file.js"), "console.log('ok');");
}

#[tokio::test]
async fn escaping_patch_path_is_never_written() {
    let project = project_with_file_js();
    let mut generator = ScriptedGenerator::new();
    for _ in 0..5 {
        generator = generator.respond("--- File: ../evil.sh ---\nrm -rf /\n");
    }
    let sandbox = ScriptedSandbox::new();
    let mut terminal = ScriptedTerminal::new(&["anything"]);

    let outcome = ModifyWorkflow::new(generator, sandbox.clone(), ProjectWalker::new(project.path()))
        .run(&mut terminal)
        .await
        .unwrap();

    assert_eq!(outcome, ModifyOutcome::Aborted { attempts: 5 });
    assert!(sandbox.executions().is_empty());
    assert!(!project.path().parent().unwrap().join("evil.sh").exists());
}

#[tokio::test]
async fn generation_failures_consume_attempts() {
    let project = project_with_file_js();
    let generator = ScriptedGenerator::new()
        .fail("503 overloaded")
        .respond("--- File: file.js ---\nconsole.log(2);\n");
    let sandbox = ScriptedSandbox::new().succeed();
    let mut terminal = ScriptedTerminal::new(&["print two"]);

    let outcome = ModifyWorkflow::new(generator, sandbox, ProjectWalker::new(project.path()))
        .run(&mut terminal)
        .await
        .unwrap();

    assert!(matches!(outcome, ModifyOutcome::Applied { attempts: 2, .. }));
}

#[tokio::test]
async fn files_without_interpreter_are_written_unexecuted() {
    let project = project_with_file_js();
    let generator = ScriptedGenerator::new()
        .respond("--- File: NOTES.md ---\n# notes\n--- File: file.js ---\nconsole.log(3);\n");
    let sandbox = ScriptedSandbox::new().succeed();
    let mut terminal = ScriptedTerminal::new(&["document it"]);

    let outcome = ModifyWorkflow::new(generator, sandbox.clone(), ProjectWalker::new(project.path()))
        .run(&mut terminal)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ModifyOutcome::Applied {
            files: vec![PathBuf::from("NOTES.md"), PathBuf::from("file.js")],
            attempts: 1,
        }
    );
    assert_eq!(sandbox.executions().len(), 1);
    assert_eq!(read(project.path(), "NOTES.md"), "# notes");
    assert!(terminal.said("NOTES.md has no supported interpreter"));
}

#[tokio::test]
async fn snapshot_excludes_dependency_directories() {
    let project = project_with_file_js();
    std::fs::create_dir_all(project.path().join("node_modules/left-pad")).unwrap();
    std::fs::write(
        project.path().join("node_modules/left-pad/index.js"),
        "module.exports = pad;\n",
    )
    .unwrap();
    std::fs::write(project.path().join("package.json"), "{\"name\":\"x\"}\n").unwrap();

    let generator = ScriptedGenerator::new().respond("");
    let mut terminal = ScriptedTerminal::new(&["tidy up"]);

    ModifyWorkflow::new(
        generator.clone(),
        ScriptedSandbox::new(),
        ProjectWalker::new(project.path()),
    )
    .run(&mut terminal)
    .await
    .unwrap();

    let instruction = &generator.requests()[0].instruction;
    assert!(instruction.contains("--- File: file.js ---"));
    assert!(!instruction.contains("left-pad"));
    assert!(!instruction.contains("package.json ---"));
}

#[tokio::test]
async fn end_of_input_exits_before_generation() {
    let project = project_with_file_js();
    let generator = ScriptedGenerator::new();
    let mut terminal = ScriptedTerminal::new(&[]);

    let outcome = ModifyWorkflow::new(
        generator.clone(),
        ScriptedSandbox::new(),
        ProjectWalker::new(project.path()),
    )
    .run(&mut terminal)
    .await
    .unwrap();

    assert_eq!(outcome, ModifyOutcome::Exited);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn sandbox_fault_aborts_session() {
    let project = project_with_file_js();
    let generator = ScriptedGenerator::new().respond("--- File: file.js ---\nconsole.log(4);\n");
    let sandbox = ScriptedSandbox::new().fault("cannot create sandbox root");
    let mut terminal = ScriptedTerminal::new(&["change it"]);

    let err = ModifyWorkflow::new(generator, sandbox, ProjectWalker::new(project.path()))
        .run(&mut terminal)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SandboxCreation(_)));
    assert_eq!(read(project.path(), "file.js"), ORIGINAL_JS);
}
