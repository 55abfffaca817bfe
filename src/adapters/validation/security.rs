//! Security stage: a fixed taxonomy of vulnerability patterns.
//!
//! Every match is reported once per (class, line), as a critical finding
//! whose message starts with the class name, e.g.
//! `code-injection: eval() executes arbitrary code`.

use std::collections::HashSet;

use crate::domain::codegen::{ProjectConfig, SecurityClass, Snippet, StageKind, ValidationFinding};
use crate::ports::{StageError, ValidationStage};

use super::rules::{PatternRule, Scope, Target};
use super::source::scan;

// Code injection
pattern!(RE_EVAL, r"(^|[^\w.$])eval\s*\(");
pattern!(RE_PY_EXEC, r"(^|[^\w.])exec\s*\(");
pattern!(RE_FUNCTION_CTOR, r"\bnew\s+Function\s*\(");
pattern!(RE_STRING_TIMER, r#"\bset(Timeout|Interval)\s*\(\s*["'`]"#);

// Command injection
pattern!(RE_OS_SYSTEM, r"\bos\.(system|popen)\s*\(");
pattern!(RE_SHELL_TRUE, r"\bsubprocess\.\w+\(.*\bshell\s*=\s*True");
pattern!(RE_CHILD_PROCESS_EXEC, r"(^|[^\w.])exec(Sync)?\s*\(|\bchild_process\.exec");
pattern!(RE_GO_SHELL, r#"\bexec\.Command\(\s*"(/bin/)?(sh|bash)""#);
pattern!(RE_JAVA_RUNTIME_EXEC, r"\bRuntime\.getRuntime\(\)\.exec\s*\(");
pattern!(RE_RUST_SHELL, r#"\bCommand::new\(\s*"(/bin/)?(sh|bash)""#);
pattern!(RE_CS_SHELL, r#"\bProcess\.Start\(\s*"(cmd|cmd\.exe|/bin/sh|bash)""#);

// SQL injection
pattern!(RE_SQL_CONCAT, r#"(?i)["'](SELECT|INSERT|UPDATE|DELETE)\b[^"']*["']\s*(\+|%)"#);
pattern!(RE_SQL_FSTRING, r#"(?i)\bf["'](SELECT|INSERT|UPDATE|DELETE)\b[^"']*\{"#);
pattern!(RE_SQL_FORMAT, r#"(?i)["'](SELECT|INSERT|UPDATE|DELETE)\b[^"']*["']\s*\.format\("#);
pattern!(RE_SQL_TEMPLATE, r"(?i)`(SELECT|INSERT|UPDATE|DELETE)\b[^`]*\$\{");
pattern!(RE_SQL_FORMAT_MACRO, r#"(?i)format!\(\s*"(SELECT|INSERT|UPDATE|DELETE)\b"#);

// Hardcoded secrets
pattern!(RE_AWS_ACCESS_KEY, r"\bAKIA[0-9A-Z]{16}\b");
pattern!(RE_PRIVATE_KEY, r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----");
pattern!(RE_PASSWORD_ASSIGN, r#"(?i)(?:password|passwd|pwd)\s*[=:]\s*['"][^'"]{4,}['"]"#);
pattern!(RE_GENERIC_API_KEY, r#"(?i)(?:api[_-]?key|apikey)\s*[=:]\s*['"][A-Za-z0-9_\-]{16,}['"]"#);
pattern!(
    RE_GENERIC_SECRET,
    r#"(?i)(?:secret|token|auth_token|access_token)\s*[=:]\s*['"][A-Za-z0-9_\-]{16,}['"]"#
);
pattern!(RE_GITHUB_TOKEN, r"\bgh[pousr]_[A-Za-z0-9]{36}\b");
pattern!(RE_STRIPE_SECRET, r"\bsk_(?:live|test)_[A-Za-z0-9]{24,}\b");

// Insecure deserialization
pattern!(RE_PICKLE_LOAD, r"\b(pickle|cPickle|marshal|shelve)\.loads?\s*\(");
pattern!(RE_YAML_LOAD, r"\byaml\.load\s*\(");
pattern!(RE_JAVA_OBJECT_STREAM, r"\bnew\s+ObjectInputStream\s*\(");
pattern!(RE_BINARY_FORMATTER, r"\bBinaryFormatter\b");

// Weak cryptography
pattern!(RE_PY_WEAK_HASH, r"\bhashlib\.(md5|sha1)\s*\(");
pattern!(RE_JS_WEAK_HASH, r#"\bcreateHash\(\s*["'](md5|sha1)["']"#);
pattern!(RE_JAVA_WEAK_DIGEST, r#"\bMessageDigest\.getInstance\(\s*"(MD5|SHA-?1)""#);
pattern!(RE_GO_WEAK_HASH, r"\b(md5|sha1)\.(New|Sum)\w*\s*\(");
pattern!(RE_CS_WEAK_HASH, r"\b(MD5|SHA1)\.Create\s*\(");
pattern!(RE_RUST_WEAK_HASH, r"\b(md5::compute|Md5::new|Sha1::new)\b");
pattern!(RE_INSECURE_RANDOM_TOKEN, r"(?i)(token|secret|password|salt).*\bMath\.random\(\)");

// Cross-site scripting
pattern!(RE_INNER_HTML, r"\.(innerHTML|outerHTML)\s*\+?=[^=]");
pattern!(RE_DOCUMENT_WRITE, r"\bdocument\.write(ln)?\s*\(");
pattern!(RE_DANGEROUS_HTML, r"\bdangerouslySetInnerHTML\b");
pattern!(RE_MARK_SAFE, r"\bmark_safe\s*\(");

/// Rules grouped by the class they report.
static SECURITY_RULES: &[(SecurityClass, PatternRule)] = &[
    (
        SecurityClass::CodeInjection,
        PatternRule::new(Scope::Any, Target::Code, &RE_EVAL, "eval() executes arbitrary code"),
    ),
    (
        SecurityClass::CodeInjection,
        PatternRule::new(Scope::Python, Target::Code, &RE_PY_EXEC, "exec() executes arbitrary code"),
    ),
    (
        SecurityClass::CodeInjection,
        PatternRule::new(
            Scope::EcmaScript,
            Target::Code,
            &RE_FUNCTION_CTOR,
            "Function constructor compiles code from a string",
        ),
    ),
    (
        SecurityClass::CodeInjection,
        PatternRule::new(
            Scope::EcmaScript,
            Target::Raw,
            &RE_STRING_TIMER,
            "timer evaluates a code string",
        ),
    ),
    (
        SecurityClass::CommandInjection,
        PatternRule::new(Scope::Python, Target::Code, &RE_OS_SYSTEM, "shell command run through os module"),
    ),
    (
        SecurityClass::CommandInjection,
        PatternRule::new(Scope::Python, Target::Raw, &RE_SHELL_TRUE, "subprocess call with shell=True"),
    ),
    (
        SecurityClass::CommandInjection,
        PatternRule::new(
            Scope::EcmaScript,
            Target::Code,
            &RE_CHILD_PROCESS_EXEC,
            "child_process exec runs a shell command",
        ),
    ),
    (
        SecurityClass::CommandInjection,
        PatternRule::new(Scope::Go, Target::Raw, &RE_GO_SHELL, "command runs through a shell"),
    ),
    (
        SecurityClass::CommandInjection,
        PatternRule::new(
            Scope::Java,
            Target::Code,
            &RE_JAVA_RUNTIME_EXEC,
            "Runtime.exec runs an external command",
        ),
    ),
    (
        SecurityClass::CommandInjection,
        PatternRule::new(Scope::Rust, Target::Raw, &RE_RUST_SHELL, "command runs through a shell"),
    ),
    (
        SecurityClass::CommandInjection,
        PatternRule::new(Scope::CSharp, Target::Raw, &RE_CS_SHELL, "process starts a shell"),
    ),
    (
        SecurityClass::SqlInjection,
        PatternRule::new(Scope::Any, Target::Raw, &RE_SQL_CONCAT, "SQL built by string concatenation"),
    ),
    (
        SecurityClass::SqlInjection,
        PatternRule::new(Scope::Python, Target::Raw, &RE_SQL_FSTRING, "SQL built from an f-string"),
    ),
    (
        SecurityClass::SqlInjection,
        PatternRule::new(Scope::Python, Target::Raw, &RE_SQL_FORMAT, "SQL built with str.format"),
    ),
    (
        SecurityClass::SqlInjection,
        PatternRule::new(
            Scope::EcmaScript,
            Target::Raw,
            &RE_SQL_TEMPLATE,
            "SQL built from a template literal",
        ),
    ),
    (
        SecurityClass::SqlInjection,
        PatternRule::new(Scope::Rust, Target::Raw, &RE_SQL_FORMAT_MACRO, "SQL built with format!"),
    ),
    (
        SecurityClass::HardcodedSecret,
        PatternRule::new(Scope::Any, Target::AnyLine, &RE_AWS_ACCESS_KEY, "AWS access key in source"),
    ),
    (
        SecurityClass::HardcodedSecret,
        PatternRule::new(Scope::Any, Target::AnyLine, &RE_PRIVATE_KEY, "private key in source"),
    ),
    (
        SecurityClass::HardcodedSecret,
        PatternRule::new(Scope::Any, Target::Raw, &RE_PASSWORD_ASSIGN, "hardcoded password"),
    ),
    (
        SecurityClass::HardcodedSecret,
        PatternRule::new(Scope::Any, Target::Raw, &RE_GENERIC_API_KEY, "hardcoded API key"),
    ),
    (
        SecurityClass::HardcodedSecret,
        PatternRule::new(Scope::Any, Target::Raw, &RE_GENERIC_SECRET, "hardcoded secret or token"),
    ),
    (
        SecurityClass::HardcodedSecret,
        PatternRule::new(Scope::Any, Target::AnyLine, &RE_GITHUB_TOKEN, "GitHub token in source"),
    ),
    (
        SecurityClass::HardcodedSecret,
        PatternRule::new(Scope::Any, Target::AnyLine, &RE_STRIPE_SECRET, "Stripe secret key in source"),
    ),
    (
        SecurityClass::InsecureDeserialization,
        PatternRule::new(
            Scope::Python,
            Target::Code,
            &RE_PICKLE_LOAD,
            "unpickling can execute arbitrary code",
        ),
    ),
    (
        SecurityClass::InsecureDeserialization,
        PatternRule::new(
            Scope::Python,
            Target::Code,
            &RE_YAML_LOAD,
            "yaml.load without a safe loader",
        )
        .unless("SafeLoader"),
    ),
    (
        SecurityClass::InsecureDeserialization,
        PatternRule::new(
            Scope::Java,
            Target::Code,
            &RE_JAVA_OBJECT_STREAM,
            "ObjectInputStream deserializes untrusted data",
        ),
    ),
    (
        SecurityClass::InsecureDeserialization,
        PatternRule::new(
            Scope::CSharp,
            Target::Code,
            &RE_BINARY_FORMATTER,
            "BinaryFormatter deserializes untrusted data",
        ),
    ),
    (
        SecurityClass::WeakCryptography,
        PatternRule::new(Scope::Python, Target::Code, &RE_PY_WEAK_HASH, "MD5 or SHA-1 used for hashing"),
    ),
    (
        SecurityClass::WeakCryptography,
        PatternRule::new(Scope::EcmaScript, Target::Raw, &RE_JS_WEAK_HASH, "MD5 or SHA-1 used for hashing"),
    ),
    (
        SecurityClass::WeakCryptography,
        PatternRule::new(Scope::Java, Target::Raw, &RE_JAVA_WEAK_DIGEST, "MD5 or SHA-1 used for hashing"),
    ),
    (
        SecurityClass::WeakCryptography,
        PatternRule::new(Scope::Go, Target::Code, &RE_GO_WEAK_HASH, "MD5 or SHA-1 used for hashing"),
    ),
    (
        SecurityClass::WeakCryptography,
        PatternRule::new(Scope::CSharp, Target::Code, &RE_CS_WEAK_HASH, "MD5 or SHA-1 used for hashing"),
    ),
    (
        SecurityClass::WeakCryptography,
        PatternRule::new(Scope::Rust, Target::Code, &RE_RUST_WEAK_HASH, "MD5 or SHA-1 used for hashing"),
    ),
    (
        SecurityClass::WeakCryptography,
        PatternRule::new(
            Scope::EcmaScript,
            Target::Code,
            &RE_INSECURE_RANDOM_TOKEN,
            "Math.random() is not a secure source for secrets",
        ),
    ),
    (
        SecurityClass::CrossSiteScripting,
        PatternRule::new(Scope::EcmaScript, Target::Code, &RE_INNER_HTML, "HTML assigned from a string"),
    ),
    (
        SecurityClass::CrossSiteScripting,
        PatternRule::new(Scope::EcmaScript, Target::Code, &RE_DOCUMENT_WRITE, "document.write with dynamic content"),
    ),
    (
        SecurityClass::CrossSiteScripting,
        PatternRule::new(
            Scope::EcmaScript,
            Target::Code,
            &RE_DANGEROUS_HTML,
            "dangerouslySetInnerHTML bypasses escaping",
        ),
    ),
    (
        SecurityClass::CrossSiteScripting,
        PatternRule::new(Scope::Python, Target::Code, &RE_MARK_SAFE, "mark_safe disables escaping")
            .for_framework("django"),
    ),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityStage;

impl SecurityStage {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationStage for SecurityStage {
    fn kind(&self) -> StageKind {
        StageKind::Security
    }

    fn check(
        &self,
        snippet: &Snippet,
        _config: &ProjectConfig,
    ) -> Result<Vec<ValidationFinding>, StageError> {
        let scanned = scan(snippet.content(), snippet.language());

        let mut seen: HashSet<(SecurityClass, usize)> = HashSet::new();
        let mut hits: Vec<(usize, SecurityClass, &'static str)> = Vec::new();
        for (class, rule) in SECURITY_RULES {
            if !rule.applies_to(snippet.language(), snippet.framework()) {
                continue;
            }
            for line in rule.matching_lines(&scanned) {
                if seen.insert((*class, line)) {
                    hits.push((line, *class, rule.message));
                }
            }
        }
        hits.sort_by_key(|(line, _, _)| *line);

        Ok(hits
            .into_iter()
            .map(|(line, class, message)| {
                ValidationFinding::new(StageKind::Security, format!("{}: {}", class, message))
                    .at_line(line)
            })
            .collect())
    }
}
