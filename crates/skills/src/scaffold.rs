//! New bundle skeletons.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    SKILL_MD,
    error::{Error, Result},
    validate::is_valid_skill_name,
};

const RESOURCE_DIRS: [&str; 3] = ["scripts", "references", "assets"];

const REFERENCES_README: &str = "# Reference Documentation\n\nPlace detailed reference documentation in this directory. It is loaded on demand when the skill needs it.\n";

/// Create `base_dir/name` with a `SKILL.md` template, the resource
/// directories, and an example script. Returns the new bundle directory.
pub async fn create_skill(base_dir: &Path, name: &str) -> Result<PathBuf> {
    // Single-character names pass the format rule, so also keep out path characters.
    if !is_valid_skill_name(name) || !name.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(Error::invalid_skill_name(name));
    }

    let dir = base_dir.join(name);
    if tokio::fs::try_exists(&dir).await? {
        return Err(Error::AlreadyExists { path: dir });
    }

    for sub in RESOURCE_DIRS {
        tokio::fs::create_dir_all(dir.join(sub)).await?;
    }
    tokio::fs::write(dir.join(SKILL_MD), skill_template(name)).await?;

    let script = dir.join("scripts").join("example.sh");
    tokio::fs::write(&script, example_script(name)).await?;
    make_executable(&script).await?;

    tokio::fs::write(dir.join("references").join("README.md"), REFERENCES_README).await?;

    info!(%name, path = %dir.display(), "created skill");
    Ok(dir)
}

/// `pdf-form-filler` becomes `Pdf Form Filler`.
pub fn title_from_name(name: &str) -> String {
    name.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn skill_template(name: &str) -> String {
    let title = title_from_name(name);
    format!(
        r#"---
name: {name}
description: "[TODO: Describe what this skill does and when it should be used]"
---

# {title}

## Overview

[TODO: 1-2 sentences describing the core functionality]

## Use Cases

- [TODO: Use case 1]
- [TODO: Use case 2]

## Workflow

### Step 1: [TODO]

[TODO: Detailed description]

### Step 2: [TODO]

[TODO: Detailed description]

## Resources

- `scripts/` - Executable scripts
- `references/` - Reference documentation
- `assets/` - Templates and resource files

## Examples

```
[TODO: Add usage examples]
```
"#
    )
}

fn example_script(name: &str) -> String {
    format!("#!/usr/bin/env bash\n# Example script for {name}\nset -euo pipefail\n\necho \"Hello from {name}!\"\n")
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
