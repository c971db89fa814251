// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    tagged_fence   = { "Here you go:\n```python\nimport os\nprint(1)\n```\nDone.", "import os\nprint(1)" },
    bare_fence     = { "```\nfn main() {}\n\n```", "fn main() {}" },
    first_fence    = { "```js\na\n```\n```js\nb\n```", "a" },
    no_fence       = { "  plain body\n\n", "plain body" },
    empty          = { "", "" },
    only_spaces    = { "   \n ", "" },
    unclosed_fence = { "```py\nx = 1\n", "```py\nx = 1" },
    keeps_indent   = { "```\n    indented\n```", "    indented" },
)]
fn extracts(reply: &str, expected: &str) {
    assert_eq!(extract_code(reply), expected);
}
