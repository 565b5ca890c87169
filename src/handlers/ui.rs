use axum::{response::Html, routing::get, Router};

pub fn ui_routes() -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/chat", get(chat_page))
}

pub async fn chat_page() -> Html<String> {
    let html = r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Rate My Professor Chat</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f0f0f0;
            height: 100vh;
            display: flex;
            flex-direction: column;
        }

        header { padding: 1rem; font-size: 1.4rem; }

        .chat {
            flex-grow: 1;
            width: 90%;
            max-width: 600px;
            margin: 0 auto 1rem;
            display: flex;
            flex-direction: column;
            background: #fff;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0, 0, 0, 0.15);
            padding: 1rem;
            overflow: hidden;
        }

        .messages { flex-grow: 1; overflow-y: auto; margin-bottom: 1rem; }

        .message { display: flex; margin-bottom: 1rem; }
        .message.user { justify-content: flex-end; }

        .bubble {
            max-width: 80%;
            padding: 0.75rem 1rem;
            border-radius: 8px;
            white-space: pre-wrap;
            line-height: 1.5;
        }
        .assistant .bubble { background: #e3f2fd; }
        .user .bubble { background: #fce4ec; }

        .copy {
            display: block;
            margin-top: 0.4rem;
            font-size: 0.75rem;
            background: none;
            border: none;
            color: #1976d2;
            cursor: pointer;
        }

        .loading { text-align: center; color: #666; display: none; }

        form { display: flex; gap: 0.5rem; }
        input {
            flex-grow: 1;
            padding: 0.75rem;
            border: 1px solid #ccc;
            border-radius: 4px;
            font-size: 1rem;
        }
        button[type=submit] {
            padding: 0 1.25rem;
            background: #1976d2;
            color: #fff;
            border: none;
            border-radius: 4px;
            cursor: pointer;
        }
        button[disabled] { opacity: 0.6; cursor: default; }
    </style>
</head>
<body>
    <header>Rate My Professor Chat</header>
    <div class="chat">
        <div class="messages" id="messages"></div>
        <div class="loading" id="loading">Thinking...</div>
        <form id="composer">
            <input id="input" type="text" placeholder="Type your message..." autocomplete="off">
            <button type="submit" id="send">Send</button>
        </form>
    </div>

    <script>
        const ERROR_MESSAGE = "Sorry, there was an error processing your request.";

        // Single source of truth for what is rendered and what is sent.
        let messages = [
            { role: "assistant", content: "Hi! I am the rate my professor bot. How can I help you today?" }
        ];

        function apply(event) {
            if (event.type === "append") {
                messages = [...messages, event.message];
            } else if (event.type === "replaceLast") {
                messages = [...messages.slice(0, -1), event.message];
            }
            render();
        }

        function render() {
            const list = document.getElementById("messages");
            list.innerHTML = "";
            for (const message of messages) {
                const row = document.createElement("div");
                row.className = "message " + message.role;
                const bubble = document.createElement("div");
                bubble.className = "bubble";
                bubble.textContent = message.content;
                const copy = document.createElement("button");
                copy.className = "copy";
                copy.textContent = "Copy";
                copy.onclick = () => navigator.clipboard.writeText(message.content);
                bubble.appendChild(copy);
                row.appendChild(bubble);
                list.appendChild(row);
            }
            list.scrollTop = list.scrollHeight;
        }

        function setLoading(loading) {
            document.getElementById("loading").style.display = loading ? "block" : "none";
            document.getElementById("send").disabled = loading;
        }

        async function sendMessage(text) {
            if (!text.trim()) return;

            const userMessage = { role: "user", content: text };
            const history = [...messages, userMessage];
            apply({ type: "append", message: userMessage });
            setLoading(true);

            try {
                const response = await fetch("/api/chat", {
                    method: "POST",
                    headers: { "Content-Type": "application/json" },
                    body: JSON.stringify(history),
                });
                if (!response.ok) throw new Error("chat request failed with " + response.status);

                const reader = response.body.getReader();
                const decoder = new TextDecoder();
                let answer = "";
                apply({ type: "append", message: { role: "assistant", content: "" } });

                while (true) {
                    const { done, value } = await reader.read();
                    if (done) break;
                    answer += decoder.decode(value, { stream: true });
                    apply({ type: "replaceLast", message: { role: "assistant", content: answer } });
                }
            } catch (error) {
                console.error("Error:", error);
                apply({ type: "append", message: { role: "assistant", content: ERROR_MESSAGE } });
            } finally {
                setLoading(false);
            }
        }

        document.getElementById("composer").addEventListener("submit", (e) => {
            e.preventDefault();
            const input = document.getElementById("input");
            const text = input.value;
            input.value = "";
            sendMessage(text);
        });

        render();
    </script>
</body>
</html>
    "###;

    Html(html.to_string())
}
