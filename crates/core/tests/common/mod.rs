#![allow(dead_code)]

use mapscope_core::{MapConfig, MapEngine};
use std::fs;
use std::path::Path;

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Express-style project: routes -> controllers -> services -> models,
/// plus one route that imports nothing.
pub fn shop_fixture(root: &Path) {
    write(root, "src/routes/users.js", "const c = require('../controllers/users');\n");
    write(root, "src/routes/orders.js", "const c = require('../controllers/orders');\n");
    write(root, "src/routes/health.js", "module.exports = {};\n");
    write(root, "src/controllers/users.js", "const s = require('../services/users');\n");
    write(root, "src/controllers/orders.js", "const s = require('../services/orders');\n");
    write(
        root,
        "src/services/users.js",
        "const m = require('../models/user');\n\nasync function getUserById(id) {\n  return m.find(id);\n}\n\nmodule.exports = { getUserById };\n",
    );
    write(root, "src/services/orders.js", "const m = require('../models/order');\n");
    write(root, "src/models/user.js", "module.exports = {};\n");
    write(root, "src/models/order.js", "module.exports = {};\n");
}

pub fn engine(root: &Path, maps: &Path) -> MapEngine {
    MapEngine::new(root, MapConfig::default().with_map_dir(maps))
}
