// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform bridge via JNI.
//
// Requires the Android NDK. The pending-request slot lives in
// SharedPreferences (one preferences file per namespace) and installed-app
// checks go through PackageManager. All calls block on the JVM and must be
// made from a blocking-capable thread, never the WebView's UI thread.

#![cfg(target_os = "android")]

use std::sync::OnceLock;

use jni::{JNIEnv, JavaVM};
use jni::objects::{JObject, JString, JValue};

use popupbridge_core::error::{PopupBridgeError, Result};

use crate::traits::*;

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Process-wide handle to the JVM, resolved on first use.
static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();

/// Obtain a [`JNIEnv`] handle from the global Android context.
///
/// Resolves the `JavaVM*` set by the NDK glue through
/// `ndk_context::android_context()`, then attaches the current thread
/// permanently so blocking-pool threads can be reused without re-attaching.
fn jni_env() -> Result<JNIEnv<'static>> {
    let vm = match JAVA_VM.get() {
        Some(vm) => vm,
        None => {
            let ctx = ndk_context::android_context();
            // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
            // The pointer is guaranteed valid for the lifetime of the process.
            let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
                .map_err(|e| PopupBridgeError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
            JAVA_VM.get_or_init(|| vm)
        }
    };
    vm.attach_current_thread_permanently()
        .map_err(|e| PopupBridgeError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// Obtain the hosting Android `Context` as a [`JObject`].
fn context() -> Result<JObject<'static>> {
    let ctx = ndk_context::android_context();
    let ptr = ctx.context();
    if ptr.is_null() {
        return Err(PopupBridgeError::Bridge(
            "Android context is null; native activity not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Context.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

/// Convenience: map any `jni::errors::Error` into `PopupBridgeError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> PopupBridgeError {
    PopupBridgeError::Bridge(format!("{context}: {e}"))
}

/// `context.getSharedPreferences(namespace, MODE_PRIVATE)`.
fn shared_preferences<'a>(
    env: &mut JNIEnv<'a>,
    context: &JObject<'_>,
    namespace: &str,
) -> Result<JObject<'a>> {
    let j_name: JString = env
        .new_string(namespace)
        .map_err(|e| jni_err("new_string(namespace)", e))?;

    env.call_method(
        context,
        "getSharedPreferences",
        "(Ljava/lang/String;I)Landroid/content/SharedPreferences;",
        &[
            JValue::Object(&j_name),
            JValue::Int(0), // MODE_PRIVATE
        ],
    )
    .map_err(|e| jni_err("getSharedPreferences", e))?
    .l()
    .map_err(|e| jni_err("getSharedPreferences->l", e))
}

/// `prefs.edit()`.
fn editor<'a>(env: &mut JNIEnv<'a>, prefs: &JObject<'_>) -> Result<JObject<'a>> {
    env.call_method(
        prefs,
        "edit",
        "()Landroid/content/SharedPreferences$Editor;",
        &[],
    )
    .map_err(|e| jni_err("SharedPreferences.edit", e))?
    .l()
    .map_err(|e| jni_err("edit->l", e))
}

/// `editor.commit()`; the write is on disk when this returns.
fn commit(env: &mut JNIEnv<'_>, editor: &JObject<'_>) -> Result<()> {
    let ok = env
        .call_method(editor, "commit", "()Z", &[])
        .map_err(|e| jni_err("editor.commit", e))?
        .z()
        .map_err(|e| jni_err("commit->z", e))?;
    if ok {
        Ok(())
    } else {
        Err(PopupBridgeError::Store("SharedPreferences commit failed".into()))
    }
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the PopupBridge platform bridge.
///
/// Zero-sized; all state lives on the Java side.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Create a new Android bridge. No JNI call happens until a trait method
    /// is invoked.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }
}

// ---------------------------------------------------------------------------
// NativePreferences: android.content.SharedPreferences
// ---------------------------------------------------------------------------

impl NativePreferences for AndroidBridge {
    fn get_string(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let mut env = jni_env()?;
        let context = context()?;
        let prefs = shared_preferences(&mut env, &context, namespace)?;

        let j_key: JString = env
            .new_string(key)
            .map_err(|e| jni_err("new_string(key)", e))?;

        let value: JObject = env
            .call_method(
                &prefs,
                "getString",
                "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;",
                &[JValue::Object(&j_key), JValue::Object(&JObject::null())],
            )
            .map_err(|e| jni_err("getString", e))?
            .l()
            .map_err(|e| jni_err("getString->l", e))?;

        if value.is_null() {
            tracing::debug!(namespace, key, "Android: preference not set");
            return Ok(None);
        }

        let value: String = env
            .get_string(&JString::from(value))
            .map_err(|e| jni_err("get_string(value)", e))?
            .into();
        Ok(Some(value))
    }

    fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let mut env = jni_env()?;
        let context = context()?;
        let prefs = shared_preferences(&mut env, &context, namespace)?;
        let editor = editor(&mut env, &prefs)?;

        let j_key: JString = env
            .new_string(key)
            .map_err(|e| jni_err("new_string(key)", e))?;
        let j_value: JString = env
            .new_string(value)
            .map_err(|e| jni_err("new_string(value)", e))?;

        env.call_method(
            &editor,
            "putString",
            "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/SharedPreferences$Editor;",
            &[JValue::Object(&j_key), JValue::Object(&j_value)],
        )
        .map_err(|e| jni_err("editor.putString", e))?;

        commit(&mut env, &editor)?;
        tracing::info!(namespace, key, "Android: preference stored");
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        let mut env = jni_env()?;
        let context = context()?;
        let prefs = shared_preferences(&mut env, &context, namespace)?;
        let editor = editor(&mut env, &prefs)?;

        let j_key: JString = env
            .new_string(key)
            .map_err(|e| jni_err("new_string(key)", e))?;

        env.call_method(
            &editor,
            "remove",
            "(Ljava/lang/String;)Landroid/content/SharedPreferences$Editor;",
            &[JValue::Object(&j_key)],
        )
        .map_err(|e| jni_err("editor.remove", e))?;

        commit(&mut env, &editor)?;
        tracing::info!(namespace, key, "Android: preference removed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NativeAppChecks: android.content.pm.PackageManager
// ---------------------------------------------------------------------------

impl NativeAppChecks for AndroidBridge {
    /// `packageManager.getApplicationInfo(package, 0)`; a
    /// `NameNotFoundException` means the app is not installed.
    fn is_app_installed(&self, package_name: &str) -> Result<bool> {
        let mut env = jni_env()?;
        let context = context()?;

        let package_manager: JObject = env
            .call_method(
                &context,
                "getPackageManager",
                "()Landroid/content/pm/PackageManager;",
                &[],
            )
            .map_err(|e| jni_err("getPackageManager", e))?
            .l()
            .map_err(|e| jni_err("getPackageManager->l", e))?;

        let j_package: JString = env
            .new_string(package_name)
            .map_err(|e| jni_err("new_string(package_name)", e))?;

        let result = env.call_method(
            &package_manager,
            "getApplicationInfo",
            "(Ljava/lang/String;I)Landroid/content/pm/ApplicationInfo;",
            &[JValue::Object(&j_package), JValue::Int(0)],
        );

        match result {
            Ok(_) => Ok(true),
            Err(jni::errors::Error::JavaException) => {
                env.exception_clear()
                    .map_err(|e| jni_err("exception_clear", e))?;
                tracing::debug!(package_name, "Android: app not installed");
                Ok(false)
            }
            Err(e) => Err(jni_err("getApplicationInfo", e)),
        }
    }
}
